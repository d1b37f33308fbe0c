//! CLI error type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read experiment file: {path}")]
    ExperimentRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid experiment file {path}: {source}")]
    ExperimentParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Model error: {0}")]
    Model(#[from] co_reference::ReferenceError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] co_sim::SimError),

    #[error("Results error: {0}")]
    Results(#[from] co_results::ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;
