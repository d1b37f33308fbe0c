//! Shared helpers for building reference models.

use co_model::{
    Causality, CoSimulationInfo, DefaultExperiment, Initial, ModelDescription, ModelVariable,
    ScalarValue, Variability, VariableType,
};

/// Relative tolerance when comparing internal time against event times.
pub const EPSILON_TIME: f64 = 1e-10;

/// Value reference of the independent variable in every reference model.
pub const TIME_VR: u32 = 0;

pub fn time_variable() -> ModelVariable {
    ModelVariable::new(
        "time",
        TIME_VR,
        VariableType::Float64,
        Causality::Independent,
        Variability::Continuous,
    )
    .with_unit("s")
}

/// A continuous state with an exact start value.
pub fn state(name: &str, vr: u32, start: f64) -> ModelVariable {
    ModelVariable::new(
        name,
        vr,
        VariableType::Float64,
        Causality::Output,
        Variability::Continuous,
    )
    .with_initial(Initial::Exact)
    .with_start(ScalarValue::Float64(start))
}

pub fn derivative(name: &str, vr: u32, of: u32) -> ModelVariable {
    ModelVariable::new(
        name,
        vr,
        VariableType::Float64,
        Causality::Local,
        Variability::Continuous,
    )
    .with_initial(Initial::Calculated)
    .derivative_of(of)
}

pub fn parameter(name: &str, vr: u32, variability: Variability, start: f64) -> ModelVariable {
    ModelVariable::new(
        name,
        vr,
        VariableType::Float64,
        Causality::Parameter,
        variability,
    )
    .with_initial(Initial::Exact)
    .with_start(ScalarValue::Float64(start))
}

/// Metadata shared by every reference model: ME and CS supported.
pub fn describe(
    model_name: &str,
    number_of_continuous_states: usize,
    number_of_event_indicators: usize,
    variables: Vec<ModelVariable>,
    default_experiment: DefaultExperiment,
    co_simulation: CoSimulationInfo,
) -> ModelDescription {
    ModelDescription {
        model_name: model_name.to_string(),
        instantiation_token: format!("{{co-reference/{model_name}}}"),
        description: None,
        number_of_continuous_states,
        number_of_event_indicators,
        variables,
        default_experiment: Some(default_experiment),
        model_exchange: true,
        co_simulation: Some(co_simulation),
    }
}

/// Sign change of an event indicator across one step.
pub fn crossed(previous: f64, current: f64) -> bool {
    (previous <= 0.0 && current > 0.0) || (previous > 0.0 && current <= 0.0)
}

/// Whether `time` has reached the scheduled `event_time`.
pub fn time_reached(time: f64, event_time: Option<f64>) -> bool {
    event_time.is_some_and(|t| time + EPSILON_TIME * (1.0 + time.abs()) >= t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossed() {
        assert!(crossed(0.1, -0.1));
        assert!(crossed(-0.1, 0.0 + 1e-3));
        assert!(crossed(0.5, 0.0));
        assert!(!crossed(0.5, 0.4));
        assert!(!crossed(-0.5, 0.0));
    }

    #[test]
    fn test_time_reached() {
        assert!(time_reached(1.0, Some(1.0)));
        assert!(time_reached(0.2 * 5.0, Some(1.0)));
        assert!(!time_reached(0.9, Some(1.0)));
        assert!(!time_reached(5.0, None));
    }

    #[test]
    fn state_metadata() {
        let v = state("h", 1, 1.0);
        assert_eq!(v.initial, Some(Initial::Exact));
        assert_eq!(v.start, Some(ScalarValue::Float64(1.0)));
    }
}
