//! Van der Pol oscillator.

use crate::common::{derivative, describe, parameter, state, time_variable};
use crate::traits::ReferenceModel;
use co_model::{
    CoSimulationInfo, DefaultExperiment, ModelDescription, ScalarValue, ValueReference,
    Variability,
};

pub const X0: u32 = 1;
pub const DER_X0: u32 = 2;
pub const X1: u32 = 3;
pub const DER_X1: u32 = 4;
pub const MU: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct VanDerPol {
    pub x0: f64,
    pub x1: f64,
    pub mu: f64,
}

impl Default for VanDerPol {
    fn default() -> Self {
        Self {
            x0: 2.0,
            x1: 0.0,
            mu: 1.0,
        }
    }
}

impl VanDerPol {
    fn der_x1(&self) -> f64 {
        self.mu * ((1.0 - self.x0 * self.x0) * self.x1) - self.x0
    }
}

impl ReferenceModel for VanDerPol {
    fn description() -> ModelDescription {
        describe(
            "VanDerPol",
            2,
            0,
            vec![
                time_variable(),
                state("x0", X0, 2.0),
                derivative("der(x0)", DER_X0, X0),
                state("x1", X1, 0.0),
                derivative("der(x1)", DER_X1, X1),
                parameter("mu", MU, Variability::Fixed, 1.0),
            ],
            DefaultExperiment {
                start_time: Some(0.0),
                stop_time: Some(20.0),
                tolerance: None,
                step_size: Some(1e-2),
            },
            CoSimulationInfo {
                fixed_internal_step_size: Some(1e-2),
                can_interpolate_inputs: false,
            },
        )
    }

    fn get(&self, vr: ValueReference) -> Option<ScalarValue> {
        let value = match vr.get() {
            X0 => self.x0,
            DER_X0 | X1 => self.x1,
            DER_X1 => self.der_x1(),
            MU => self.mu,
            _ => return None,
        };
        Some(ScalarValue::Float64(value))
    }

    fn set(&mut self, vr: ValueReference, value: ScalarValue) -> bool {
        let Some(v) = value.as_f64() else {
            return false;
        };
        match vr.get() {
            X0 => self.x0 = v,
            X1 => self.x1 = v,
            MU => self.mu = v,
            _ => return false,
        }
        true
    }

    fn continuous_states(&self, x: &mut [f64]) {
        x[0] = self.x0;
        x[1] = self.x1;
    }

    fn set_continuous_states(&mut self, x: &[f64]) {
        self.x0 = x[0];
        self.x1 = x[1];
    }

    fn derivatives(&self, _time: f64, dx: &mut [f64]) {
        dx[0] = self.x1;
        dx[1] = self.der_x1();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivatives_at_start() {
        let model = VanDerPol::default();
        let mut dx = [0.0; 2];
        model.derivatives(0.0, &mut dx);
        assert_eq!(dx, [0.0, -2.0]);
    }
}
