//! Error types for calls into a model instance.

use crate::value::VariableType;
use co_core::ValueReference;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported by a model instance call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Ok,
    Warning,
    Discard,
    Error,
    Fatal,
}

/// Errors returned by [`crate::ModelInstance`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstanceError {
    #[error("{function} returned status {status:?}")]
    Call {
        function: &'static str,
        status: Status,
    },

    #[error("{function} is not supported by this instance")]
    Unsupported { function: &'static str },

    #[error("{function} must not be called in state {state}")]
    IllegalCall {
        function: &'static str,
        state: &'static str,
    },

    #[error("Unknown value reference {vr} in {function}")]
    UnknownValueReference {
        function: &'static str,
        vr: ValueReference,
    },

    #[error("Value reference {vr} in {function} is not of type {expected:?}")]
    TypeMismatch {
        function: &'static str,
        vr: ValueReference,
        expected: VariableType,
    },

    #[error("Buffer size mismatch in {function}: expected {expected}, got {actual}")]
    SizeMismatch {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Instantiation failed: {message}")]
    Instantiation { message: String },
}

pub type InstanceResult<T> = Result<T, InstanceError>;

impl InstanceError {
    /// Status equivalent of this error.
    pub fn status(&self) -> Status {
        match self {
            Self::Call { status, .. } => *status,
            Self::Instantiation { .. } => Status::Fatal,
            _ => Status::Error,
        }
    }

    pub fn is_discard(&self) -> bool {
        self.status() == Status::Discard
    }
}

/// Check a caller-supplied buffer against the expected size.
pub fn ensure_len(function: &'static str, expected: usize, actual: usize) -> InstanceResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(InstanceError::SizeMismatch {
            function,
            expected,
            actual,
        })
    }
}
