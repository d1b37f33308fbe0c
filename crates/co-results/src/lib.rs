//! co-results: trajectory export and run storage.
//!
//! Runs are stored one directory per run id, with a pretty-printed
//! `manifest.json` and one JSON row per line in `rows.jsonl`.

pub mod csv;
pub mod hash;
pub mod store;
pub mod types;

pub use csv::{read_input_csv, read_input_csv_file, write_trajectory_csv, write_trajectory_csv_file};
pub use hash::compute_run_id;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Corrupt run {run_id}: {message}")]
    Corrupt { run_id: String, message: String },

    #[error("CSV error on line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error(transparent)]
    Sim(#[from] co_sim::SimError),
}
