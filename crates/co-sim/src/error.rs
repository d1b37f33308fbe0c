//! Error types for simulation runs.

use co_core::CoreError;
use co_model::InstanceError;
use thiserror::Error;

/// Errors that end a master algorithm run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Instantiation failed: {message}")]
    Instantiation { message: String },

    #[error("The model requested to terminate the simulation during the initial event iteration")]
    InitialEventTerminated,

    #[error("Solver failure at t={time}: {what}")]
    SolverFailure { what: &'static str, time: f64 },

    #[error("do_step returned early at t={time} but early return is not allowed")]
    EarlyReturnNotAllowed { time: f64 },

    #[error("do_step was discarded at t={time} and the instance did not terminate")]
    Discard { time: f64 },

    #[error("The start values for the following variables could not be set: {}", names.join(", "))]
    UnappliedStartValues { names: Vec<String> },

    #[error("Input error: {message}")]
    Input { message: String },

    #[error(transparent)]
    Instance(#[from] InstanceError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<CoreError> for SimError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidArg { what } | CoreError::NonFinite { what, .. } => {
                SimError::InvalidArg { what }
            }
            other => SimError::Configuration {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unapplied_start_values_lists_names() {
        let err = SimError::UnappliedStartValues {
            names: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().ends_with("a, b"));
    }

    #[test]
    fn grid_errors_become_configuration_errors() {
        let err: SimError = CoreError::NotAMultiple {
            what: "output interval",
            value: 0.1,
            base: 0.03,
        }
        .into();
        assert!(matches!(err, SimError::Configuration { .. }));

        let err: SimError = CoreError::InvalidArg { what: "span" }.into();
        assert!(matches!(err, SimError::InvalidArg { what: "span" }));
    }
}
