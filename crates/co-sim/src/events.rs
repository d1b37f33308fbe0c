//! Events and the discrete-state update iteration.

use crate::error::SimResult;
use co_model::ModelInstance;
use std::fmt;

/// What interrupted continuous integration.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A discontinuity of the input signals.
    Input(f64),
    /// A time event scheduled by the instance.
    Time(f64),
    /// Zero crossings: `1` rising, `-1` falling per indicator.
    State(Vec<i32>),
    /// Requested by `completed_integrator_step`.
    Step,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Input(t) => write!(f, "input event at t={t}"),
            Event::Time(t) => write!(f, "time event at t={t}"),
            Event::State(roots) => write!(f, "state event {roots:?}"),
            Event::Step => write!(f, "step event"),
        }
    }
}

/// Accumulated result of iterating `update_discrete_states`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EventIteration {
    pub terminate: bool,
    pub values_changed: bool,
    pub nominals_changed: bool,
    /// From the last update.
    pub next_event_time: Option<f64>,
    pub iterations: usize,
}

/// Call `update_discrete_states` until the instance stops asking for another
/// round or requests termination.
pub fn iterate_discrete_states<I: ModelInstance + ?Sized>(
    instance: &mut I,
) -> SimResult<EventIteration> {
    let mut result = EventIteration::default();
    loop {
        let update = instance.update_discrete_states()?;
        result.iterations += 1;
        result.terminate |= update.terminate_simulation;
        result.values_changed |= update.values_of_continuous_states_changed;
        result.nominals_changed |= update.nominals_of_continuous_states_changed;
        result.next_event_time = update.next_event_time;
        if update.terminate_simulation || !update.discrete_states_need_update {
            return Ok(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use co_model::{InstanceConfig, InterfaceType, LogSink};
    use co_reference::{ReferenceFactory, Stair};

    #[test]
    fn event_descriptions() {
        assert_eq!(Event::Time(1.0).to_string(), "time event at t=1");
        assert_eq!(Event::State(vec![1, 0]).to_string(), "state event [1, 0]");
    }

    #[test]
    fn initial_iteration_reports_first_time_event() {
        let config = InstanceConfig::new("stair", InterfaceType::ModelExchange)
            .with_log_sink(LogSink::Discard);
        let mut instance = ReferenceFactory::<Stair>::new()
            .instantiate_reference(config)
            .unwrap();
        instance.enter_initialization_mode(None, 0.0, Some(10.0)).unwrap();
        instance.exit_initialization_mode().unwrap();

        let result = iterate_discrete_states(&mut instance).unwrap();
        assert!(!result.terminate);
        assert!(result.iterations >= 1);
        assert_eq!(result.next_event_time, Some(1.0));
    }
}
