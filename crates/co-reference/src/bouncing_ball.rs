//! Bouncing ball: a point mass falling under gravity, bouncing off the floor.

use crate::common::{derivative, describe, parameter, state, time_variable};
use crate::traits::{EventUpdate, ReferenceModel};
use co_model::{
    Causality, CoSimulationInfo, DefaultExperiment, Initial, ModelDescription, ModelVariable,
    ScalarValue, ValueReference, Variability, VariableType,
};

pub const H: u32 = 1;
pub const DER_H: u32 = 2;
pub const V: u32 = 3;
pub const DER_V: u32 = 4;
pub const G: u32 = 5;
pub const E: u32 = 6;
pub const V_MIN: u32 = 7;

/// States `h` (height) and `v` (velocity); one event indicator on `h`.
///
/// At each impact the velocity is reversed and scaled by the coefficient of
/// restitution `e`. Once the rebound speed drops below `v_min` the ball comes
/// to rest and gravity is switched off.
#[derive(Debug, Clone, PartialEq)]
pub struct BouncingBall {
    pub h: f64,
    pub v: f64,
    pub g: f64,
    pub e: f64,
    pub v_min: f64,
}

impl Default for BouncingBall {
    fn default() -> Self {
        Self {
            h: 1.0,
            v: 0.0,
            g: -9.81,
            e: 0.7,
            v_min: 0.1,
        }
    }
}

impl ReferenceModel for BouncingBall {
    fn description() -> ModelDescription {
        let variables = vec![
            time_variable(),
            state("h", H, 1.0).with_unit("m"),
            derivative("der(h)", DER_H, H).with_unit("m/s"),
            state("v", V, 0.0).with_unit("m/s"),
            derivative("der(v)", DER_V, V).with_unit("m/s2"),
            parameter("g", G, Variability::Fixed, -9.81).with_unit("m/s2"),
            parameter("e", E, Variability::Tunable, 0.7)
                .with_description("Coefficient of restitution"),
            ModelVariable::new(
                "v_min",
                V_MIN,
                VariableType::Float64,
                Causality::Local,
                Variability::Constant,
            )
            .with_initial(Initial::Exact)
            .with_start(ScalarValue::Float64(0.1)),
        ];
        describe(
            "BouncingBall",
            2,
            1,
            variables,
            DefaultExperiment {
                start_time: Some(0.0),
                stop_time: Some(3.0),
                tolerance: None,
                step_size: Some(1e-2),
            },
            CoSimulationInfo {
                fixed_internal_step_size: Some(1e-3),
                can_interpolate_inputs: false,
            },
        )
    }

    fn get(&self, vr: ValueReference) -> Option<ScalarValue> {
        let value = match vr.get() {
            H => self.h,
            DER_H | V => self.v,
            DER_V | G => self.g,
            E => self.e,
            V_MIN => self.v_min,
            _ => return None,
        };
        Some(ScalarValue::Float64(value))
    }

    fn set(&mut self, vr: ValueReference, value: ScalarValue) -> bool {
        let Some(x) = value.as_f64() else {
            return false;
        };
        match vr.get() {
            H => self.h = x,
            V => self.v = x,
            G => self.g = x,
            E => self.e = x,
            _ => return false,
        }
        true
    }

    fn continuous_states(&self, x: &mut [f64]) {
        x[0] = self.h;
        x[1] = self.v;
    }

    fn set_continuous_states(&mut self, x: &[f64]) {
        self.h = x[0];
        self.v = x[1];
    }

    fn derivatives(&self, _time: f64, dx: &mut [f64]) {
        dx[0] = self.v;
        dx[1] = self.g;
    }

    fn event_indicators(&self, _time: f64, z: &mut [f64]) {
        z[0] = if self.h == 0.0 && self.v == 0.0 {
            1.0
        } else {
            self.h
        };
    }

    fn event_update(&mut self, _time: f64, next_event_time: Option<f64>) -> EventUpdate {
        let mut values_changed = false;
        if self.h <= 0.0 && self.v < 0.0 {
            self.h = f64::MIN_POSITIVE;
            self.v = -self.e * self.v;
            if self.v < self.v_min {
                // at rest
                self.v = 0.0;
                self.g = 0.0;
            }
            values_changed = true;
        }
        EventUpdate {
            values_changed,
            terminate: false,
            next_event_time,
        }
    }
}
