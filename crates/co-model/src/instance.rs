//! The model instance contract.

use crate::config::InstanceConfig;
use crate::description::ModelDescription;
use crate::error::{InstanceError, InstanceResult};
use crate::value::{Values, ValuesMut};
use co_core::ValueReference;
use serde::{Deserialize, Serialize};

/// Lifecycle capabilities declared by an instance.
///
/// The master algorithms branch on these flags only, never on which interface
/// generation an instance implements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// ME: `completed_integrator_step` must be called after every solver step.
    pub needs_completed_integrator_step: bool,
    /// CS: communication steps may differ from the output interval.
    pub can_handle_variable_communication_step_size: bool,
    /// CS: the instance supports event mode between steps.
    pub has_event_mode: bool,
    /// CS: `do_step` may return before the requested communication point.
    pub provides_early_return: bool,
    /// CS: input derivatives can be set before a step.
    pub can_interpolate_inputs: bool,
    /// CS: `do_step` may end with a discard status, after which termination and
    /// the last successful time are queried through status functions.
    pub reports_discard_status: bool,
}

/// Result of `completed_integrator_step`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompletedIntegratorStep {
    pub enter_event_mode: bool,
    pub terminate_simulation: bool,
}

/// Result of one `update_discrete_states` call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiscreteStatesUpdate {
    pub discrete_states_need_update: bool,
    pub terminate_simulation: bool,
    pub nominals_of_continuous_states_changed: bool,
    pub values_of_continuous_states_changed: bool,
    /// Time of the next scheduled time event, if any.
    pub next_event_time: Option<f64>,
}

/// Result of `do_step`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DoStepOutcome {
    pub event_handling_needed: bool,
    pub terminate_simulation: bool,
    pub early_return: bool,
    pub last_successful_time: f64,
}

/// One live, exclusively owned model instance.
///
/// Instances are not reentrant; callers must never drive one instance from two
/// simulations at the same time. Dropping an instance releases it.
pub trait ModelInstance {
    fn instance_name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn number_of_continuous_states(&self) -> usize;

    fn number_of_event_indicators(&self) -> usize;

    fn enter_initialization_mode(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> InstanceResult<()>;

    fn exit_initialization_mode(&mut self) -> InstanceResult<()>;

    fn set_time(&mut self, time: f64) -> InstanceResult<()>;

    fn get_continuous_states(&mut self, x: &mut [f64]) -> InstanceResult<()>;

    fn set_continuous_states(&mut self, x: &[f64]) -> InstanceResult<()>;

    fn get_derivatives(&mut self, dx: &mut [f64]) -> InstanceResult<()>;

    fn get_event_indicators(&mut self, z: &mut [f64]) -> InstanceResult<()>;

    fn completed_integrator_step(
        &mut self,
        no_set_state_prior: bool,
    ) -> InstanceResult<CompletedIntegratorStep>;

    fn enter_event_mode(&mut self) -> InstanceResult<()>;

    fn update_discrete_states(&mut self) -> InstanceResult<DiscreteStatesUpdate>;

    fn enter_continuous_time_mode(&mut self) -> InstanceResult<()>;

    fn enter_step_mode(&mut self) -> InstanceResult<()>;

    fn do_step(
        &mut self,
        current_time: f64,
        step_size: f64,
        no_set_state_prior: bool,
    ) -> InstanceResult<DoStepOutcome>;

    /// Batched typed getter: one call per type band.
    fn get_values(&mut self, vrs: &[ValueReference], values: ValuesMut<'_>) -> InstanceResult<()>;

    /// Batched typed setter: one call per type band.
    fn set_values(&mut self, vrs: &[ValueReference], values: Values<'_>) -> InstanceResult<()>;

    fn set_input_derivatives(
        &mut self,
        _vrs: &[ValueReference],
        _order: u32,
        _values: &[f64],
    ) -> InstanceResult<()> {
        Err(InstanceError::Unsupported {
            function: "set_input_derivatives",
        })
    }

    /// Whether the instance terminated itself during the last `do_step`.
    fn terminated_status(&mut self) -> InstanceResult<bool> {
        Err(InstanceError::Unsupported {
            function: "terminated_status",
        })
    }

    fn last_successful_time(&mut self) -> InstanceResult<f64> {
        Err(InstanceError::Unsupported {
            function: "last_successful_time",
        })
    }

    fn terminate(&mut self) -> InstanceResult<()>;
}

impl<T: ModelInstance + ?Sized> ModelInstance for Box<T> {
    fn instance_name(&self) -> &str {
        (**self).instance_name()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn number_of_continuous_states(&self) -> usize {
        (**self).number_of_continuous_states()
    }

    fn number_of_event_indicators(&self) -> usize {
        (**self).number_of_event_indicators()
    }

    fn enter_initialization_mode(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> InstanceResult<()> {
        (**self).enter_initialization_mode(tolerance, start_time, stop_time)
    }

    fn exit_initialization_mode(&mut self) -> InstanceResult<()> {
        (**self).exit_initialization_mode()
    }

    fn set_time(&mut self, time: f64) -> InstanceResult<()> {
        (**self).set_time(time)
    }

    fn get_continuous_states(&mut self, x: &mut [f64]) -> InstanceResult<()> {
        (**self).get_continuous_states(x)
    }

    fn set_continuous_states(&mut self, x: &[f64]) -> InstanceResult<()> {
        (**self).set_continuous_states(x)
    }

    fn get_derivatives(&mut self, dx: &mut [f64]) -> InstanceResult<()> {
        (**self).get_derivatives(dx)
    }

    fn get_event_indicators(&mut self, z: &mut [f64]) -> InstanceResult<()> {
        (**self).get_event_indicators(z)
    }

    fn completed_integrator_step(
        &mut self,
        no_set_state_prior: bool,
    ) -> InstanceResult<CompletedIntegratorStep> {
        (**self).completed_integrator_step(no_set_state_prior)
    }

    fn enter_event_mode(&mut self) -> InstanceResult<()> {
        (**self).enter_event_mode()
    }

    fn update_discrete_states(&mut self) -> InstanceResult<DiscreteStatesUpdate> {
        (**self).update_discrete_states()
    }

    fn enter_continuous_time_mode(&mut self) -> InstanceResult<()> {
        (**self).enter_continuous_time_mode()
    }

    fn enter_step_mode(&mut self) -> InstanceResult<()> {
        (**self).enter_step_mode()
    }

    fn do_step(
        &mut self,
        current_time: f64,
        step_size: f64,
        no_set_state_prior: bool,
    ) -> InstanceResult<DoStepOutcome> {
        (**self).do_step(current_time, step_size, no_set_state_prior)
    }

    fn get_values(&mut self, vrs: &[ValueReference], values: ValuesMut<'_>) -> InstanceResult<()> {
        (**self).get_values(vrs, values)
    }

    fn set_values(&mut self, vrs: &[ValueReference], values: Values<'_>) -> InstanceResult<()> {
        (**self).set_values(vrs, values)
    }

    fn set_input_derivatives(
        &mut self,
        vrs: &[ValueReference],
        order: u32,
        values: &[f64],
    ) -> InstanceResult<()> {
        (**self).set_input_derivatives(vrs, order, values)
    }

    fn terminated_status(&mut self) -> InstanceResult<bool> {
        (**self).terminated_status()
    }

    fn last_successful_time(&mut self) -> InstanceResult<f64> {
        (**self).last_successful_time()
    }

    fn terminate(&mut self) -> InstanceResult<()> {
        (**self).terminate()
    }
}

/// A loadable model: metadata plus a factory for instances.
pub trait Model {
    fn description(&self) -> &ModelDescription;

    /// Create a new instance in the instantiated state.
    fn instantiate(&self, config: InstanceConfig) -> InstanceResult<Box<dyn ModelInstance>>;
}
