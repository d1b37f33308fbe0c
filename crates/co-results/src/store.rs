//! Run storage API.

use crate::types::{RowRecord, RunManifest};
use crate::{ResultsError, ResultsResult};
use co_model::ValueBuffer;
use co_sim::Trajectory;
use std::fs;
use std::path::PathBuf;

const MANIFEST: &str = "manifest.json";
const ROWS: &str = "rows.jsonl";

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> ResultsResult<Self> {
        let root_dir = root_dir.into();
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST).exists()
    }

    /// Write the manifest and the trajectory rows, replacing a previous run
    /// with the same id.
    pub fn save_run(&self, manifest: &RunManifest, trajectory: &Trajectory) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join(MANIFEST), manifest_json)?;

        let mut rows_content = String::new();
        for i in 0..trajectory.len() {
            let record = RowRecord {
                time: trajectory.time[i],
                values: trajectory.row(i).unwrap_or_default(),
            };
            rows_content.push_str(&serde_json::to_string(&record)?);
            rows_content.push('\n');
        }
        fs::write(run_dir.join(ROWS), rows_content)?;

        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join(MANIFEST);

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Rebuild the stored trajectory with its native column types.
    pub fn load_trajectory(&self, run_id: &str) -> ResultsResult<Trajectory> {
        let manifest = self.load_manifest(run_id)?;
        let rows_path = self.run_dir(run_id).join(ROWS);
        if !rows_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let corrupt = |message: String| ResultsError::Corrupt {
            run_id: run_id.to_string(),
            message,
        };

        let content = fs::read_to_string(rows_path)?;
        let mut records = Vec::with_capacity(manifest.rows);
        for line in content.lines() {
            if !line.trim().is_empty() {
                let record: RowRecord = serde_json::from_str(line)?;
                records.push(record);
            }
        }

        let mut trajectory = Trajectory::new(manifest.names.clone(), manifest.types.clone());
        trajectory.columns = manifest
            .types
            .iter()
            .map(|&ty| ValueBuffer::zeros(ty, records.len()))
            .collect();

        for (i, record) in records.into_iter().enumerate() {
            if record.values.len() != trajectory.columns.len() {
                return Err(corrupt(format!(
                    "row {i} has {} values, expected {}",
                    record.values.len(),
                    trajectory.columns.len()
                )));
            }
            for (column, value) in trajectory.columns.iter_mut().zip(record.values) {
                if !column.as_values_mut().store(i, value) {
                    return Err(corrupt(format!("row {i} does not match the column types")));
                }
            }
            trajectory.time.push(record.time);
        }

        Ok(trajectory)
    }

    /// Stored runs of one model, oldest first.
    pub fn list_runs(&self, model_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.model_name == model_name
                {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
