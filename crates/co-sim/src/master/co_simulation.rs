//! The Co-Simulation loop.

use super::{SimOutcome, StepFinished, StopReason, check_start_values, initialize, input_signal};
use crate::error::{SimError, SimResult};
use crate::events::iterate_discrete_states;
use crate::options::SimOptions;
use crate::recorder::Recorder;
use co_core::{EPS, RunStats, Stopwatch, reached};
use co_model::{ModelDescription, ModelInstance};
use tracing::{debug, info, warn};

/// Simulate an instance created for Co-Simulation.
///
/// The instance advances itself between communication points on the output
/// grid. Instances that report discard status are stepped on the grid and a
/// discarded step after self-termination ends the run cleanly. Other instances
/// are also stopped at input discontinuities when they accept variable step
/// sizes, may return early when allowed, and have their events handled in
/// event mode when `options.use_event_mode` is set.
pub fn run_co_simulation<I: ModelInstance + ?Sized>(
    instance: &mut I,
    description: &ModelDescription,
    options: &SimOptions,
    mut step_finished: Option<StepFinished<'_>>,
) -> SimResult<SimOutcome> {
    let resolved = options.resolve(description)?;
    let capabilities = instance.capabilities();
    if options.set_input_derivatives && !capabilities.can_interpolate_inputs {
        return Err(SimError::Configuration {
            message: "input derivatives requested but the instance cannot interpolate inputs"
                .to_string(),
        });
    }
    if options.use_event_mode && !capabilities.has_event_mode {
        return Err(SimError::Configuration {
            message: "event mode requested but the instance does not support it".to_string(),
        });
    }

    let stopwatch = Stopwatch::with_timeout(resolved.timeout);
    let mut stats = RunStats::default();
    let output_interval = resolved.output_interval;
    let stop_time = resolved.stop_time;
    let mut time = resolved.initial_time;
    let mut input = input_signal(options, description)?;
    let legacy = capabilities.reports_discard_status;

    info!(
        instance = instance.instance_name(),
        start = time,
        stop = stop_time,
        output_interval,
        event_mode = options.use_event_mode,
        "co-simulation run"
    );

    if options.initialize && options.resume.is_none() {
        let remaining = initialize(
            instance,
            description,
            options,
            &mut input,
            resolved.relative_tolerance,
            time,
            stop_time,
        )?;

        if options.use_event_mode {
            let iteration = iterate_discrete_states(instance)?;
            stats.event_iterations += iteration.iterations;
            if iteration.terminate {
                return Err(SimError::InitialEventTerminated);
            }
            instance.enter_step_mode()?;
        }

        check_start_values(options, remaining)?;
    }

    let mut recorder = Recorder::new(description, options.output.as_deref(), Some(output_interval));
    let mut n_steps = (time / output_interval).round();
    if !reached(time, n_steps * output_interval) {
        n_steps = (time / output_interval).floor();
    }
    let mut terminate_requested = false;
    let mut stop_reason = StopReason::Finished;

    loop {
        recorder.sample(instance, time, true)?;

        if stopwatch.expired() {
            warn!(time, "simulation timed out");
            stop_reason = StopReason::Timeout;
            break;
        }

        if terminate_requested {
            info!(time, "model requested termination");
            stop_reason = StopReason::ModelTerminated;
            break;
        }

        if reached(time, stop_time) {
            break;
        }

        // right limits: a value switched at `time` holds over the coming step
        input.apply_after_event(instance, time)?;

        if legacy {
            let t_grid = (n_steps + 1.0) * output_interval;
            let (step_size, t_next) = if t_grid < stop_time - EPS {
                (t_grid - time, t_grid)
            } else {
                (stop_time - time, stop_time)
            };

            match instance.do_step(time, step_size, true) {
                Ok(_) => {
                    stats.steps += 1;
                    n_steps += 1.0;
                    time = t_next;
                }
                Err(e) if e.is_discard() => {
                    if !instance.terminated_status()? {
                        return Err(SimError::Discard { time });
                    }
                    time = instance.last_successful_time()?;
                    warn!(time, "step discarded after the model terminated");
                    recorder.sample(instance, time, true)?;
                    stop_reason = StopReason::Discarded;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            let t_next = ((n_steps + 1.0) * output_interval).min(stop_time);
            let t_input_event = input.next_event(time);
            let input_event = capabilities.can_handle_variable_communication_step_size
                && t_next > t_input_event;
            let step_size = if input_event {
                t_input_event - time
            } else {
                t_next - time
            };

            let outcome = instance.do_step(time, step_size, true)?;
            stats.steps += 1;

            if outcome.early_return && !options.early_return_allowed {
                return Err(SimError::EarlyReturnNotAllowed {
                    time: outcome.last_successful_time,
                });
            }

            let reached_time = if outcome.early_return {
                outcome.last_successful_time
            } else {
                time + step_size
            };
            if reached(reached_time, t_next) {
                time = t_next;
                n_steps += 1.0;
            } else {
                time = reached_time;
            }
            terminate_requested = outcome.terminate_simulation;

            let input_event = input_event && reached(time, t_input_event);
            if options.use_event_mode
                && !terminate_requested
                && (input_event || outcome.event_handling_needed)
            {
                debug!(time, input_event, "handling event");
                stats.events += 1;
                recorder.sample(instance, time, true)?;

                instance.enter_event_mode()?;
                input.apply_after_event(instance, time)?;

                let iteration = iterate_discrete_states(instance)?;
                stats.event_iterations += iteration.iterations;
                if iteration.terminate {
                    terminate_requested = true;
                } else {
                    instance.enter_step_mode()?;
                }
            }
        }

        if let Some(callback) = step_finished.as_deref_mut()
            && !callback(time, &recorder)
        {
            recorder.sample(instance, time, true)?;
            debug!(time, "paused by step callback");
            stop_reason = StopReason::Paused;
            break;
        }
    }

    if options.terminate && stop_reason != StopReason::Paused {
        instance.terminate()?;
    }

    stats.wall_time_s = stopwatch.elapsed_s();
    info!(
        time,
        reason = ?stop_reason,
        steps = stats.steps,
        events = stats.events,
        wall_time_s = stats.wall_time_s,
        "co-simulation run finished"
    );

    Ok(SimOutcome {
        trajectory: recorder.result(),
        stop_reason,
        time,
        next_event_time: None,
        stats,
    })
}
