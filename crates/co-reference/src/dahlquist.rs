//! Dahlquist test equation `x' = -k x`.

use crate::common::{derivative, describe, parameter, state, time_variable};
use crate::traits::ReferenceModel;
use co_model::{
    CoSimulationInfo, DefaultExperiment, ModelDescription, ScalarValue, ValueReference,
    Variability,
};

pub const X: u32 = 1;
pub const DER_X: u32 = 2;
pub const K: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Dahlquist {
    pub x: f64,
    pub k: f64,
}

impl Default for Dahlquist {
    fn default() -> Self {
        Self { x: 1.0, k: 1.0 }
    }
}

impl ReferenceModel for Dahlquist {
    fn description() -> ModelDescription {
        describe(
            "Dahlquist",
            1,
            0,
            vec![
                time_variable(),
                state("x", X, 1.0),
                derivative("der(x)", DER_X, X),
                parameter("k", K, Variability::Fixed, 1.0),
            ],
            DefaultExperiment {
                start_time: Some(0.0),
                stop_time: Some(10.0),
                tolerance: None,
                step_size: Some(0.1),
            },
            CoSimulationInfo {
                fixed_internal_step_size: Some(0.1),
                can_interpolate_inputs: false,
            },
        )
    }

    fn get(&self, vr: ValueReference) -> Option<ScalarValue> {
        let value = match vr.get() {
            X => self.x,
            DER_X => -self.k * self.x,
            K => self.k,
            _ => return None,
        };
        Some(ScalarValue::Float64(value))
    }

    fn set(&mut self, vr: ValueReference, value: ScalarValue) -> bool {
        let Some(v) = value.as_f64() else {
            return false;
        };
        match vr.get() {
            X => self.x = v,
            K => self.k = v,
            _ => return false,
        }
        true
    }

    fn continuous_states(&self, x: &mut [f64]) {
        x[0] = self.x;
    }

    fn set_continuous_states(&mut self, x: &[f64]) {
        self.x = x[0];
    }

    fn derivatives(&self, _time: f64, dx: &mut [f64]) {
        dx[0] = -self.k * self.x;
    }
}
