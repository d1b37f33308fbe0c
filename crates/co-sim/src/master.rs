//! Master algorithms: drive one model instance from start to stop time.
//!
//! [`run_model_exchange`] integrates the continuous states itself and handles
//! input, time, state and step events. [`run_co_simulation`] lets the instance
//! advance itself between communication points. Both borrow a live instance
//! and leave it alive when the step callback pauses the run, so a later call
//! can continue from [`SimOutcome::resume_point`].

use crate::error::{SimError, SimResult};
use crate::input::InputSignal;
use crate::options::{ResumePoint, SimOptions};
use crate::recorder::Recorder;
use crate::start_values::{
    StartValues, apply_start_values, settable_in_initialization_mode, settable_in_instantiated,
};
use crate::trajectory::Trajectory;
use co_core::RunStats;
use co_model::{
    InstanceConfig, InterfaceType, LoggedInstance, Model, ModelDescription, ModelInstance,
};
use serde::{Deserialize, Serialize};

mod co_simulation;
mod model_exchange;

pub use co_simulation::run_co_simulation;
pub use model_exchange::run_model_exchange;

/// Callback after every step; returning `false` pauses the run.
pub type StepFinished<'a> = &'a mut dyn FnMut(f64, &Recorder) -> bool;

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Reached the stop time.
    Finished,
    /// The instance requested termination.
    ModelTerminated,
    /// A legacy instance discarded a step after terminating itself.
    Discarded,
    /// The wall-clock timeout expired.
    Timeout,
    /// The step callback returned `false`; the instance is still live.
    Paused,
}

/// Result of one master algorithm call.
#[derive(Clone, Debug)]
pub struct SimOutcome {
    pub trajectory: Trajectory,
    pub stop_reason: StopReason,
    /// Time reached.
    pub time: f64,
    /// Time event scheduled by the instance when the run ended.
    pub next_event_time: Option<f64>,
    pub stats: RunStats,
}

impl SimOutcome {
    /// Where to continue a paused run.
    pub fn resume_point(&self) -> Option<ResumePoint> {
        (self.stop_reason == StopReason::Paused).then_some(ResumePoint {
            time: self.time,
            next_event_time: self.next_event_time,
        })
    }
}

/// Instantiate `model`, run it with `options`, then terminate and release it.
pub fn simulate(model: &dyn Model, options: &SimOptions) -> SimResult<SimOutcome> {
    simulate_with_progress(model, options, None)
}

/// [`simulate`] with a step callback. The instance is released when the run
/// returns, so a pause cannot be resumed.
pub fn simulate_with_progress(
    model: &dyn Model,
    options: &SimOptions,
    step_finished: Option<StepFinished<'_>>,
) -> SimResult<SimOutcome> {
    let description = model.description();
    let config = InstanceConfig::new(description.model_name.clone(), options.interface)
        .with_early_return(options.early_return_allowed)
        .with_event_mode(options.use_event_mode);
    let instance = model
        .instantiate(config)
        .map_err(|e| SimError::Instantiation {
            message: e.to_string(),
        })?;

    if options.log_calls {
        let mut instance = LoggedInstance::new(instance);
        run(&mut instance, description, options, step_finished)
    } else {
        let mut instance = instance;
        run(&mut instance, description, options, step_finished)
    }
}

fn run<I: ModelInstance + ?Sized>(
    instance: &mut I,
    description: &ModelDescription,
    options: &SimOptions,
    step_finished: Option<StepFinished<'_>>,
) -> SimResult<SimOutcome> {
    match options.interface {
        InterfaceType::ModelExchange => {
            run_model_exchange(instance, description, options, step_finished)
        }
        InterfaceType::CoSimulation => {
            run_co_simulation(instance, description, options, step_finished)
        }
    }
}

/// Start values, initialization mode and inputs at `time`.
///
/// Returns the start values that could not be applied.
pub(crate) fn initialize<I: ModelInstance + ?Sized>(
    instance: &mut I,
    description: &ModelDescription,
    options: &SimOptions,
    input: &mut InputSignal,
    tolerance: Option<f64>,
    time: f64,
    stop_time: f64,
) -> SimResult<StartValues> {
    let remaining = apply_start_values(
        instance,
        description,
        &options.start_values,
        settable_in_instantiated,
    )?;
    instance.enter_initialization_mode(
        tolerance,
        time,
        options.set_stop_time.then_some(stop_time),
    )?;
    let remaining = apply_start_values(
        instance,
        description,
        &remaining,
        settable_in_initialization_mode,
    )?;
    input.apply_all(instance, time)?;
    instance.exit_initialization_mode()?;
    Ok(remaining)
}

pub(crate) fn check_start_values(options: &SimOptions, remaining: StartValues) -> SimResult<()> {
    if options.validate && !remaining.is_empty() {
        return Err(SimError::UnappliedStartValues {
            names: remaining.into_keys().collect(),
        });
    }
    Ok(())
}

pub(crate) fn input_signal(
    options: &SimOptions,
    description: &ModelDescription,
) -> SimResult<InputSignal> {
    let signal = match &options.input {
        Some(table) => InputSignal::new(table, description)?,
        None => InputSignal::none(),
    };
    Ok(signal.with_input_derivatives(options.set_input_derivatives))
}
