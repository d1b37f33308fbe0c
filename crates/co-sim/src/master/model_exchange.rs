//! The Model Exchange loop.

use super::{SimOutcome, StepFinished, StopReason, check_start_values, initialize, input_signal};
use crate::error::{SimError, SimResult};
use crate::events::{Event, iterate_discrete_states};
use crate::options::{DEFAULT_RELATIVE_TOLERANCE, SimOptions};
use crate::recorder::Recorder;
use crate::solver::{ActiveSolver, BdfOptions, BdfSolver, ForwardEuler, Solver, SolverKind};
use co_core::{
    EPS, RunStats, Stopwatch, ensure_multiple_of, is_close, next_grid_point, reached,
};
use co_model::{ModelDescription, ModelInstance};
use tracing::{debug, info, warn};

/// Simulate an instance created for Model Exchange.
///
/// Initializes the instance unless `options` resume a paused run, then
/// alternates between solver steps in continuous-time mode and event
/// iterations in event mode until the stop time. The instance is terminated
/// at the end unless the run was paused or `options.terminate` is off.
pub fn run_model_exchange<I: ModelInstance + ?Sized>(
    instance: &mut I,
    description: &ModelDescription,
    options: &SimOptions,
    mut step_finished: Option<StepFinished<'_>>,
) -> SimResult<SimOutcome> {
    let resolved = options.resolve(description)?;
    let output_interval = resolved.output_interval;
    let step_size = resolved.step_size;
    if options.solver == SolverKind::Euler {
        ensure_multiple_of(output_interval, step_size, "output interval")?;
    }

    let stopwatch = Stopwatch::with_timeout(resolved.timeout);
    let mut stats = RunStats::default();
    let tolerance = resolved
        .relative_tolerance
        .unwrap_or(DEFAULT_RELATIVE_TOLERANCE);
    let stop_time = resolved.stop_time;
    let mut time = resolved.initial_time;
    let mut input = input_signal(options, description)?.with_input_derivatives(false);
    let mut next_event_time = options.resume.and_then(|r| r.next_event_time);

    info!(
        instance = instance.instance_name(),
        start = time,
        stop = stop_time,
        solver = ?options.solver,
        output_interval,
        "model exchange run"
    );

    if options.initialize && options.resume.is_none() {
        let remaining = initialize(
            instance,
            description,
            options,
            &mut input,
            Some(tolerance),
            time,
            stop_time,
        )?;

        let iteration = iterate_discrete_states(instance)?;
        stats.event_iterations += iteration.iterations;
        if iteration.terminate {
            return Err(SimError::InitialEventTerminated);
        }
        next_event_time = iteration.next_event_time;
        instance.enter_continuous_time_mode()?;

        check_start_values(options, remaining)?;
    }

    let mut solver = match options.solver {
        SolverKind::Euler => ActiveSolver::Euler(ForwardEuler::new(instance)?),
        SolverKind::Bdf => {
            let bdf_options = BdfOptions {
                relative_tolerance: tolerance,
                max_step: (stop_time - resolved.start_time) / 50.0,
                ..BdfOptions::default()
            };
            ActiveSolver::Bdf(Box::new(BdfSolver::new(
                instance,
                &mut input,
                time,
                bdf_options,
            )?))
        }
    };

    let fixed_step = solver.is_fixed_step();
    let needs_completed_integrator_step = instance.capabilities().needs_completed_integrator_step;
    let mut recorder = Recorder::new(description, options.output.as_deref(), Some(output_interval));
    recorder.sample(instance, time, false)?;

    // the fixed-step grid is anchored at the start time, also when resuming
    let grid_start = resolved.start_time;
    let mut fixed_steps = ((time - grid_start) / step_size).floor().max(0.0) as u64;
    if reached(time, grid_start + (fixed_steps + 1) as f64 * step_size) {
        fixed_steps += 1;
    }
    let mut t_grid = if fixed_step {
        grid_start + fixed_steps as f64 * step_size
    } else {
        time
    };
    let mut stop_reason = StopReason::Finished;

    while !reached(time, stop_time) {
        if stopwatch.expired() {
            warn!(time, "simulation timed out");
            stop_reason = StopReason::Timeout;
            break;
        }

        if reached(time, t_grid) {
            t_grid = if fixed_step {
                fixed_steps += 1;
                grid_start + fixed_steps as f64 * step_size
            } else {
                next_grid_point(time, output_interval)
            };
        }
        let mut t_next = t_grid.min(stop_time);

        let t_input_event = input.next_event(time);
        let mut input_event = reached(t_next, t_input_event);
        if input_event {
            t_next = t_input_event;
        }

        let mut time_event = next_event_time.is_some_and(|t| reached(t_next, t));
        if time_event
            && !fixed_step
            && let Some(t) = next_event_time
        {
            t_next = t;
        }

        let mut state_event = false;
        let mut roots = Vec::new();
        if t_next - time > EPS {
            let step = solver.step(instance, &mut input, time, t_next)?;
            stats.steps += 1;
            time = step.time;
            state_event = step.state_event;
            roots = step.roots;
            if time < t_next {
                // stopped at a state event before the planned end
                input_event &= reached(time, t_input_event);
                time_event &= next_event_time.is_some_and(|t| reached(time, t));
            }
        } else {
            time = time.max(t_next);
        }

        instance.set_time(time)?;
        input.apply_continuous(instance, time)?;

        let mut step_event = false;
        if needs_completed_integrator_step {
            let completed = instance.completed_integrator_step(true)?;
            if completed.terminate_simulation {
                info!(time, "model requested termination");
                stop_reason = StopReason::ModelTerminated;
                break;
            }
            step_event = completed.enter_event_mode;
        }

        if input_event || time_event || state_event || step_event {
            let mut events = Vec::new();
            if input_event {
                events.push(Event::Input(time));
            }
            if time_event {
                events.push(Event::Time(time));
            }
            if state_event {
                events.push(Event::State(roots));
            }
            if step_event {
                events.push(Event::Step);
            }
            for event in &events {
                debug!(time, %event, "handling event");
            }
            stats.events += 1;

            if options.record_events {
                recorder.sample(instance, time, true)?;
            }

            instance.enter_event_mode()?;
            if input_event {
                input.apply_after_event(instance, time)?;
            }

            let iteration = iterate_discrete_states(instance)?;
            stats.event_iterations += iteration.iterations;
            next_event_time = iteration.next_event_time;
            if iteration.terminate {
                info!(time, "model requested termination");
                stop_reason = StopReason::ModelTerminated;
                break;
            }

            instance.enter_continuous_time_mode()?;
            solver.reset(instance, &mut input, time)?;
            stats.solver_resets += 1;

            if options.record_events {
                recorder.sample(instance, time, true)?;
            }
        }

        let on_grid = is_close(time, (time / output_interval).round() * output_interval)
            || reached(time, stop_time);
        if on_grid && recorder.last_sample_time().is_none_or(|last| time > last + EPS) {
            recorder.sample(instance, time, true)?;
        }

        if let Some(callback) = step_finished.as_deref_mut()
            && !callback(time, &recorder)
        {
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
        "model exchange run finished"
    );

    Ok(SimOutcome {
        trajectory: recorder.result(),
        stop_reason,
        time,
        next_event_time,
        stats,
    })
}
