//! The equations side of a reference model.

use co_model::{ModelDescription, ScalarValue, ValueReference};

/// Result of one discrete update of a model's equations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EventUpdate {
    /// Continuous states were changed discontinuously.
    pub values_changed: bool,
    /// The model asks the master to stop.
    pub terminate: bool,
    /// Next scheduled time event, if any.
    pub next_event_time: Option<f64>,
}

/// Equations of a model, independent of the lifecycle around them.
///
/// [`crate::ReferenceInstance`] owns the state machine and calls into these
/// methods; implementations only hold variable values. The independent
/// variable (time) is owned by the instance and never reaches `get`/`set`.
pub trait ReferenceModel: Clone + Default + Send + 'static {
    /// Static metadata. Value references in `get`/`set` refer to this.
    fn description() -> ModelDescription;

    /// Current value of a variable, or `None` for an unknown reference.
    fn get(&self, vr: ValueReference) -> Option<ScalarValue>;

    /// Store a value. The caller has already checked the type band.
    /// Returns false for an unknown reference.
    fn set(&mut self, vr: ValueReference, value: ScalarValue) -> bool;

    fn continuous_states(&self, _x: &mut [f64]) {}

    fn set_continuous_states(&mut self, _x: &[f64]) {}

    fn derivatives(&self, _time: f64, _dx: &mut [f64]) {}

    fn event_indicators(&self, _time: f64, _z: &mut [f64]) {}

    /// Recompute dependent variables (outputs) from states and inputs.
    fn calculate_values(&mut self, _time: f64) {}

    /// Time of the first time event after initialization.
    fn first_event_time(&self, _start_time: f64) -> Option<f64> {
        None
    }

    /// Discrete update at `time`. `next_event_time` is the currently
    /// scheduled time event.
    fn event_update(&mut self, _time: f64, next_event_time: Option<f64>) -> EventUpdate {
        EventUpdate {
            next_event_time,
            ..EventUpdate::default()
        }
    }
}
