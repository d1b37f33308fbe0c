//! Error types for the reference model library.

use co_model::InstanceError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferenceError {
    #[error("Unknown reference model: {name}")]
    UnknownModel { name: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;

impl From<ReferenceError> for InstanceError {
    fn from(e: ReferenceError) -> Self {
        InstanceError::Instantiation {
            message: e.to_string(),
        }
    }
}
