//! Read-only model metadata.
//!
//! The engine never parses metadata documents itself; a reader hands over a
//! [`ModelDescription`] that is only ever borrowed.

use crate::value::{ScalarValue, VariableType};
use co_core::ValueReference;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Causality {
    Parameter,
    CalculatedParameter,
    StructuralParameter,
    Input,
    Output,
    Local,
    Independent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Discrete,
    Continuous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Initial {
    Exact,
    Approx,
    Calculated,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelVariable {
    pub name: String,
    pub value_reference: ValueReference,
    pub variable_type: VariableType,
    pub causality: Causality,
    pub variability: Variability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Initial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<ScalarValue>,
    /// For a state derivative: the state variable it is the derivative of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivative_of: Option<ValueReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ModelVariable {
    pub fn new(
        name: impl Into<String>,
        value_reference: u32,
        variable_type: VariableType,
        causality: Causality,
        variability: Variability,
    ) -> Self {
        Self {
            name: name.into(),
            value_reference: ValueReference(value_reference),
            variable_type,
            causality,
            variability,
            initial: None,
            start: None,
            derivative_of: None,
            unit: None,
            description: None,
        }
    }

    pub fn with_initial(mut self, initial: Initial) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_start(mut self, start: ScalarValue) -> Self {
        self.start = Some(start);
        self
    }

    pub fn derivative_of(mut self, state: u32) -> Self {
        self.derivative_of = Some(ValueReference(state));
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_start_value(&self) -> bool {
        self.start.is_some()
    }
}

/// Default experiment hints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultExperiment {
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub tolerance: Option<f64>,
    pub step_size: Option<f64>,
}

/// Co-simulation specific metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoSimulationInfo {
    pub fixed_internal_step_size: Option<f64>,
    pub can_interpolate_inputs: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub model_name: String,
    pub instantiation_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub number_of_continuous_states: usize,
    pub number_of_event_indicators: usize,
    #[serde(default)]
    pub variables: Vec<ModelVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_experiment: Option<DefaultExperiment>,
    pub model_exchange: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_simulation: Option<CoSimulationInfo>,
}

impl ModelDescription {
    pub fn variable(&self, name: &str) -> Option<&ModelVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ModelVariable> {
        self.variables
            .iter()
            .filter(|v| v.causality == Causality::Output)
    }

    /// Continuous-state variables, in the order of their derivatives.
    pub fn states(&self) -> Vec<&ModelVariable> {
        self.variables
            .iter()
            .filter_map(|v| v.derivative_of)
            .filter_map(|vr| self.variables.iter().find(|v| v.value_reference == vr))
            .collect()
    }

    /// Variables recorded when the caller names none: outputs, else up to
    /// `max` states, else up to `max` locals, else the first `max` variables
    /// other than the independent one.
    pub fn default_output_variables(&self, max: usize) -> Vec<&ModelVariable> {
        let outputs: Vec<_> = self.outputs().collect();
        if !outputs.is_empty() {
            return outputs;
        }

        let states = self.states();
        if !states.is_empty() {
            return states.into_iter().take(max).collect();
        }

        let locals: Vec<_> = self
            .variables
            .iter()
            .filter(|v| v.causality == Causality::Local)
            .take(max)
            .collect();
        if !locals.is_empty() {
            return locals;
        }

        self.variables
            .iter()
            .filter(|v| v.causality != Causality::Independent)
            .take(max)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oscillator() -> ModelDescription {
        ModelDescription {
            model_name: "Oscillator".to_string(),
            instantiation_token: "{osc}".to_string(),
            description: None,
            number_of_continuous_states: 2,
            number_of_event_indicators: 0,
            variables: vec![
                ModelVariable::new(
                    "time",
                    0,
                    VariableType::Float64,
                    Causality::Independent,
                    Variability::Continuous,
                ),
                ModelVariable::new(
                    "x",
                    1,
                    VariableType::Float64,
                    Causality::Local,
                    Variability::Continuous,
                ),
                ModelVariable::new(
                    "der(x)",
                    2,
                    VariableType::Float64,
                    Causality::Local,
                    Variability::Continuous,
                )
                .derivative_of(1),
                ModelVariable::new(
                    "v",
                    3,
                    VariableType::Float64,
                    Causality::Local,
                    Variability::Continuous,
                ),
                ModelVariable::new(
                    "der(v)",
                    4,
                    VariableType::Float64,
                    Causality::Local,
                    Variability::Continuous,
                )
                .derivative_of(3),
            ],
            default_experiment: None,
            model_exchange: true,
            co_simulation: None,
        }
    }

    #[test]
    fn states_follow_derivatives() {
        let md = oscillator();
        let names: Vec<_> = md.states().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["x", "v"]);
    }

    #[test]
    fn default_outputs_prefer_outputs() {
        let mut md = oscillator();
        assert_eq!(md.default_output_variables(5).len(), 2);

        md.variables.push(ModelVariable::new(
            "y",
            5,
            VariableType::Float64,
            Causality::Output,
            Variability::Continuous,
        ));
        let names: Vec<_> = md
            .default_output_variables(5)
            .iter()
            .map(|v| v.name.clone())
            .collect();
        assert_eq!(names, ["y"]);
    }

    #[test]
    fn lookup_by_name() {
        let md = oscillator();
        assert_eq!(md.variable("v").map(|v| v.value_reference.get()), Some(3));
        assert!(md.variable("w").is_none());
    }
}
