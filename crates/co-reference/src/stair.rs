//! Stair: a counter incremented by a time event every second.

use crate::common::{describe, time_reached, time_variable};
use crate::traits::{EventUpdate, ReferenceModel};
use co_model::{
    Causality, CoSimulationInfo, DefaultExperiment, Initial, ModelDescription, ModelVariable,
    ScalarValue, ValueReference, Variability, VariableType,
};

pub const COUNTER: u32 = 1;

/// The model requests termination once the counter reaches this value.
pub const MAX_COUNTER: i32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Stair {
    pub counter: i32,
}

impl Default for Stair {
    fn default() -> Self {
        Self { counter: 1 }
    }
}

impl ReferenceModel for Stair {
    fn description() -> ModelDescription {
        describe(
            "Stair",
            0,
            0,
            vec![
                time_variable(),
                ModelVariable::new(
                    "counter",
                    COUNTER,
                    VariableType::Int32,
                    Causality::Output,
                    Variability::Discrete,
                )
                .with_initial(Initial::Exact)
                .with_start(ScalarValue::Int32(1)),
            ],
            DefaultExperiment {
                start_time: Some(0.0),
                stop_time: Some(10.0),
                tolerance: None,
                step_size: Some(0.2),
            },
            CoSimulationInfo {
                fixed_internal_step_size: Some(0.2),
                can_interpolate_inputs: false,
            },
        )
    }

    fn get(&self, vr: ValueReference) -> Option<ScalarValue> {
        (vr.get() == COUNTER).then_some(ScalarValue::Int32(self.counter))
    }

    fn set(&mut self, vr: ValueReference, value: ScalarValue) -> bool {
        match (vr.get(), value) {
            (COUNTER, ScalarValue::Int32(c)) => {
                self.counter = c;
                true
            }
            _ => false,
        }
    }

    fn first_event_time(&self, start_time: f64) -> Option<f64> {
        Some(start_time.floor() + 1.0)
    }

    fn event_update(&mut self, time: f64, next_event_time: Option<f64>) -> EventUpdate {
        let mut next = next_event_time;
        if let Some(t) = next_event_time
            && time_reached(time, Some(t))
        {
            self.counter += 1;
            next = Some(t + 1.0);
        }
        EventUpdate {
            values_changed: false,
            terminate: self.counter >= MAX_COUNTER,
            next_event_time: next,
        }
    }
}
