//! Start values supplied by the caller before initialization.

use crate::error::{SimError, SimResult};
use co_model::{
    Causality, Initial, ModelDescription, ModelInstance, ModelVariable, ScalarValue, ValueBuffer,
    ValueReference, Variability, VariableType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A start value as written by a user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

/// Start values by variable name.
pub type StartValues = BTreeMap<String, StartValue>;

impl StartValue {
    /// Interpret text from a command line or a form field.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text {
            "true" => return Self::Boolean(true),
            "false" => return Self::Boolean(false),
            _ => {}
        }
        if let Ok(i) = text.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(x) = text.parse::<f64>() {
            return Self::Real(x);
        }
        Self::String(text.to_string())
    }

    /// Convert into the native band of a variable.
    pub fn to_scalar(&self, variable: &ModelVariable) -> SimResult<ScalarValue> {
        let invalid = || SimError::Configuration {
            message: format!(
                "start value {self} is not a valid {} for {}",
                variable.variable_type.name(),
                variable.name
            ),
        };

        let number = match self {
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Integer(i) => Some(*i as f64),
            Self::Real(x) => Some(*x),
            Self::String(s) => {
                if s.split_whitespace().count() > 1 {
                    return Err(SimError::Configuration {
                        message: format!("start value lists are not supported ({})", variable.name),
                    });
                }
                None
            }
        };

        match (variable.variable_type, number) {
            (VariableType::String, _) => Ok(ScalarValue::String(self.to_string())),
            (VariableType::Int32 | VariableType::Int64, Some(x)) if x.fract() != 0.0 => {
                Err(invalid())
            }
            (VariableType::Boolean, Some(x)) if x != 0.0 && x != 1.0 => Err(invalid()),
            (ty, Some(x)) => ScalarValue::from_f64(ty, x).ok_or_else(invalid),
            (_, None) => Err(invalid()),
        }
    }
}

impl std::fmt::Display for StartValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Whether a start value may be set before initialization.
pub fn settable_in_instantiated(variable: &ModelVariable) -> bool {
    variable.causality == Causality::Input
        || (variable.variability != Variability::Constant
            && matches!(variable.initial, Some(Initial::Approx | Initial::Exact)))
}

/// Whether a start value may be set in initialization mode.
pub fn settable_in_initialization_mode(variable: &ModelVariable) -> bool {
    variable.causality == Causality::Input
        || (variable.variability == Variability::Tunable
            && variable.causality != Causality::Parameter)
        || (variable.variability != Variability::Constant
            && variable.initial == Some(Initial::Exact))
}

/// Set every value whose variable satisfies `settable`, one batch per type.
///
/// Returns the values that were not applied, including unknown names.
pub fn apply_start_values<I: ModelInstance + ?Sized>(
    instance: &mut I,
    description: &ModelDescription,
    values: &StartValues,
    settable: fn(&ModelVariable) -> bool,
) -> SimResult<StartValues> {
    let mut remaining = StartValues::new();
    let mut bands: BTreeMap<VariableType, (Vec<ValueReference>, Vec<ScalarValue>)> =
        BTreeMap::new();

    for (name, value) in values {
        match description.variable(name) {
            Some(variable) if settable(variable) => {
                let scalar = value.to_scalar(variable)?;
                let (vrs, scalars) = bands.entry(variable.variable_type).or_default();
                vrs.push(variable.value_reference);
                scalars.push(scalar);
            }
            _ => {
                remaining.insert(name.clone(), value.clone());
            }
        }
    }

    for (ty, (vrs, scalars)) in bands {
        let mut buffer = ValueBuffer::zeros(ty, scalars.len());
        let mut slots = buffer.as_values_mut();
        for (i, scalar) in scalars.into_iter().enumerate() {
            slots.store(i, scalar);
        }
        tracing::debug!(band = ty.name(), count = vrs.len(), "applying start values");
        instance.set_values(&vrs, buffer.as_values())?;
    }

    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use co_model::InstanceConfig;
    use co_model::{InterfaceType, LogSink};
    use co_reference::{BouncingBall, Feedthrough, ReferenceFactory, ReferenceModel};

    #[test]
    fn parse_text() {
        assert_eq!(StartValue::parse("true"), StartValue::Boolean(true));
        assert_eq!(StartValue::parse(" 3 "), StartValue::Integer(3));
        assert_eq!(StartValue::parse("0.5"), StartValue::Real(0.5));
        assert_eq!(StartValue::parse("abc"), StartValue::String("abc".into()));
    }

    #[test]
    fn conversion_to_native_bands() {
        let description = Feedthrough::description();
        let real = description.variable("Float64_continuous_input").unwrap();
        let int = description.variable("Int32_input").unwrap();
        let boolean = description.variable("Boolean_input").unwrap();
        let string = description.variable("String_parameter").unwrap();

        assert_eq!(
            StartValue::Integer(2).to_scalar(real).unwrap(),
            ScalarValue::Float64(2.0)
        );
        assert_eq!(
            StartValue::Integer(2).to_scalar(int).unwrap(),
            ScalarValue::Int32(2)
        );
        assert!(StartValue::Real(2.5).to_scalar(int).is_err());
        assert_eq!(
            StartValue::Boolean(true).to_scalar(boolean).unwrap(),
            ScalarValue::Boolean(true)
        );
        assert!(StartValue::Integer(2).to_scalar(boolean).is_err());
        assert!(StartValue::String("1 2 3".into()).to_scalar(real).is_err());
        assert_eq!(
            StartValue::String("hi".into()).to_scalar(string).unwrap(),
            ScalarValue::String("hi".into())
        );
    }

    #[test]
    fn settable_stages() {
        let description = BouncingBall::description();
        let h = description.variable("h").unwrap();
        let e = description.variable("e").unwrap();
        let v_min = description.variable("v_min").unwrap();
        let der_h = description.variable("der(h)").unwrap();

        assert!(settable_in_instantiated(h));
        assert!(settable_in_instantiated(e));
        assert!(!settable_in_instantiated(v_min));
        assert!(!settable_in_instantiated(der_h));
        assert!(settable_in_initialization_mode(h));
        assert!(!settable_in_initialization_mode(der_h));
    }

    #[test]
    fn unknown_and_unsettable_values_remain() {
        let description = BouncingBall::description();
        let config = InstanceConfig::new("ball", InterfaceType::ModelExchange)
            .with_log_sink(LogSink::Discard);
        let mut instance = ReferenceFactory::<BouncingBall>::new()
            .instantiate_reference(config)
            .unwrap();

        let mut values = StartValues::new();
        values.insert("h".into(), StartValue::Real(2.0));
        values.insert("e".into(), StartValue::Real(0.5));
        values.insert("der(h)".into(), StartValue::Real(1.0));
        values.insert("nope".into(), StartValue::Integer(1));

        let remaining =
            apply_start_values(&mut instance, &description, &values, settable_in_instantiated)
                .unwrap();
        assert_eq!(
            remaining.keys().map(String::as_str).collect::<Vec<_>>(),
            ["der(h)", "nope"]
        );
        assert_eq!(instance.model().h, 2.0);
        assert_eq!(instance.model().e, 0.5);
    }
}
