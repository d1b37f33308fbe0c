//! Result data types.

use co_core::RunStats;
use co_model::{ScalarValue, VariableType};
use co_sim::{SimOptions, StopReason};
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub model_name: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub options: SimOptions,
    pub stop_reason: StopReason,
    pub final_time: f64,
    pub stats: RunStats,
    pub names: Vec<String>,
    pub types: Vec<VariableType>,
    pub rows: usize,
}

/// One trajectory row as stored in `rows.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub time: f64,
    pub values: Vec<ScalarValue>,
}

impl RunManifest {
    /// Manifest for a finished run, stamped with the current time.
    pub fn from_outcome(
        model_name: &str,
        options: &SimOptions,
        outcome: &co_sim::SimOutcome,
    ) -> Self {
        Self {
            run_id: crate::hash::compute_run_id(model_name, options),
            model_name: model_name.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            options: options.clone(),
            stop_reason: outcome.stop_reason,
            final_time: outcome.time,
            stats: outcome.stats,
            names: outcome.trajectory.names.clone(),
            types: outcome.trajectory.types.clone(),
            rows: outcome.trajectory.len(),
        }
    }
}
