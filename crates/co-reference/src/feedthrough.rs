//! Feedthrough: every input is copied to the output of the same type.

use crate::common::{describe, parameter, time_variable};
use crate::traits::ReferenceModel;
use co_model::{
    Causality, CoSimulationInfo, DefaultExperiment, Initial, ModelDescription, ModelVariable,
    ScalarValue, ValueReference, Variability, VariableType,
};

pub const FLOAT64_FIXED_PARAMETER: u32 = 1;
pub const FLOAT64_TUNABLE_PARAMETER: u32 = 2;
pub const FLOAT64_CONTINUOUS_INPUT: u32 = 3;
pub const FLOAT64_CONTINUOUS_OUTPUT: u32 = 4;
pub const FLOAT64_DISCRETE_INPUT: u32 = 5;
pub const FLOAT64_DISCRETE_OUTPUT: u32 = 6;
pub const INT32_INPUT: u32 = 7;
pub const INT32_OUTPUT: u32 = 8;
pub const BOOLEAN_INPUT: u32 = 9;
pub const BOOLEAN_OUTPUT: u32 = 10;
pub const STRING_PARAMETER: u32 = 11;

#[derive(Debug, Clone, PartialEq)]
pub struct Feedthrough {
    pub float64_fixed_parameter: f64,
    pub float64_tunable_parameter: f64,
    pub float64_continuous_input: f64,
    pub float64_continuous_output: f64,
    pub float64_discrete_input: f64,
    pub float64_discrete_output: f64,
    pub int32_input: i32,
    pub int32_output: i32,
    pub boolean_input: bool,
    pub boolean_output: bool,
    pub string_parameter: String,
}

impl Default for Feedthrough {
    fn default() -> Self {
        Self {
            float64_fixed_parameter: 0.0,
            float64_tunable_parameter: 0.0,
            float64_continuous_input: 0.0,
            float64_continuous_output: 0.0,
            float64_discrete_input: 0.0,
            float64_discrete_output: 0.0,
            int32_input: 0,
            int32_output: 0,
            boolean_input: false,
            boolean_output: false,
            string_parameter: "Set me!".to_string(),
        }
    }
}

fn input(name: &str, vr: u32, ty: VariableType, variability: Variability, start: ScalarValue) -> ModelVariable {
    ModelVariable::new(name, vr, ty, Causality::Input, variability).with_start(start)
}

fn output(name: &str, vr: u32, ty: VariableType, variability: Variability) -> ModelVariable {
    ModelVariable::new(name, vr, ty, Causality::Output, variability).with_initial(Initial::Calculated)
}

impl ReferenceModel for Feedthrough {
    fn description() -> ModelDescription {
        let variables = vec![
            time_variable(),
            parameter("Float64_fixed_parameter", FLOAT64_FIXED_PARAMETER, Variability::Fixed, 0.0),
            parameter(
                "Float64_tunable_parameter",
                FLOAT64_TUNABLE_PARAMETER,
                Variability::Tunable,
                0.0,
            ),
            input(
                "Float64_continuous_input",
                FLOAT64_CONTINUOUS_INPUT,
                VariableType::Float64,
                Variability::Continuous,
                ScalarValue::Float64(0.0),
            ),
            output(
                "Float64_continuous_output",
                FLOAT64_CONTINUOUS_OUTPUT,
                VariableType::Float64,
                Variability::Continuous,
            ),
            input(
                "Float64_discrete_input",
                FLOAT64_DISCRETE_INPUT,
                VariableType::Float64,
                Variability::Discrete,
                ScalarValue::Float64(0.0),
            ),
            output(
                "Float64_discrete_output",
                FLOAT64_DISCRETE_OUTPUT,
                VariableType::Float64,
                Variability::Discrete,
            ),
            input(
                "Int32_input",
                INT32_INPUT,
                VariableType::Int32,
                Variability::Discrete,
                ScalarValue::Int32(0),
            ),
            output("Int32_output", INT32_OUTPUT, VariableType::Int32, Variability::Discrete),
            input(
                "Boolean_input",
                BOOLEAN_INPUT,
                VariableType::Boolean,
                Variability::Discrete,
                ScalarValue::Boolean(false),
            ),
            output(
                "Boolean_output",
                BOOLEAN_OUTPUT,
                VariableType::Boolean,
                Variability::Discrete,
            ),
            ModelVariable::new(
                "String_parameter",
                STRING_PARAMETER,
                VariableType::String,
                Causality::Parameter,
                Variability::Fixed,
            )
            .with_initial(Initial::Exact)
            .with_start(ScalarValue::String("Set me!".to_string())),
        ];
        describe(
            "Feedthrough",
            0,
            0,
            variables,
            DefaultExperiment {
                start_time: Some(0.0),
                stop_time: Some(2.0),
                tolerance: None,
                step_size: Some(0.1),
            },
            CoSimulationInfo {
                fixed_internal_step_size: Some(0.1),
                can_interpolate_inputs: true,
            },
        )
    }

    fn get(&self, vr: ValueReference) -> Option<ScalarValue> {
        let value = match vr.get() {
            FLOAT64_FIXED_PARAMETER => ScalarValue::Float64(self.float64_fixed_parameter),
            FLOAT64_TUNABLE_PARAMETER => ScalarValue::Float64(self.float64_tunable_parameter),
            FLOAT64_CONTINUOUS_INPUT => ScalarValue::Float64(self.float64_continuous_input),
            FLOAT64_CONTINUOUS_OUTPUT => ScalarValue::Float64(self.float64_continuous_output),
            FLOAT64_DISCRETE_INPUT => ScalarValue::Float64(self.float64_discrete_input),
            FLOAT64_DISCRETE_OUTPUT => ScalarValue::Float64(self.float64_discrete_output),
            INT32_INPUT => ScalarValue::Int32(self.int32_input),
            INT32_OUTPUT => ScalarValue::Int32(self.int32_output),
            BOOLEAN_INPUT => ScalarValue::Boolean(self.boolean_input),
            BOOLEAN_OUTPUT => ScalarValue::Boolean(self.boolean_output),
            STRING_PARAMETER => ScalarValue::String(self.string_parameter.clone()),
            _ => return None,
        };
        Some(value)
    }

    fn set(&mut self, vr: ValueReference, value: ScalarValue) -> bool {
        match (vr.get(), value) {
            (FLOAT64_FIXED_PARAMETER, ScalarValue::Float64(x)) => self.float64_fixed_parameter = x,
            (FLOAT64_TUNABLE_PARAMETER, ScalarValue::Float64(x)) => {
                self.float64_tunable_parameter = x
            }
            (FLOAT64_CONTINUOUS_INPUT, ScalarValue::Float64(x)) => {
                self.float64_continuous_input = x
            }
            (FLOAT64_DISCRETE_INPUT, ScalarValue::Float64(x)) => self.float64_discrete_input = x,
            (INT32_INPUT, ScalarValue::Int32(x)) => self.int32_input = x,
            (BOOLEAN_INPUT, ScalarValue::Boolean(x)) => self.boolean_input = x,
            (STRING_PARAMETER, ScalarValue::String(x)) => self.string_parameter = x,
            _ => return false,
        }
        true
    }

    fn calculate_values(&mut self, _time: f64) {
        self.float64_continuous_output = self.float64_continuous_input;
        self.float64_discrete_output = self.float64_discrete_input;
        self.int32_output = self.int32_input;
        self.boolean_output = self.boolean_input;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_follow_inputs() {
        let mut model = Feedthrough::default();
        assert!(model.set(ValueReference(INT32_INPUT), ScalarValue::Int32(4)));
        assert!(model.set(ValueReference(BOOLEAN_INPUT), ScalarValue::Boolean(true)));
        assert!(!model.set(ValueReference(INT32_OUTPUT), ScalarValue::Int32(1)));
        model.calculate_values(0.0);
        assert_eq!(model.get(ValueReference(INT32_OUTPUT)), Some(ScalarValue::Int32(4)));
        assert_eq!(
            model.get(ValueReference(BOOLEAN_OUTPUT)),
            Some(ScalarValue::Boolean(true))
        );
    }
}
