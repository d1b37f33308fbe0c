//! Content-based hashing for run IDs.

use co_sim::SimOptions;
use sha2::{Digest, Sha256};

/// SHA-256 over the model name, the serialized options and the input table.
pub fn compute_run_id(model_name: &str, options: &SimOptions) -> String {
    let mut hasher = Sha256::new();

    hasher.update(model_name.as_bytes());

    let options_json = serde_json::to_string(options).unwrap_or_default();
    hasher.update(options_json.as_bytes());

    // the input table is not part of the serialized options
    if let Some(input) = &options.input {
        for name in input.names() {
            hasher.update(name.as_bytes());
            if let Some(column) = input.column(name) {
                for v in column {
                    hasher.update(v.to_le_bytes());
                }
            }
        }
        for t in input.time() {
            hasher.update(t.to_le_bytes());
        }
    }

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use co_sim::InputTable;

    fn options(stop_time: f64) -> SimOptions {
        SimOptions {
            stop_time: Some(stop_time),
            ..SimOptions::default()
        }
    }

    #[test]
    fn hash_stability() {
        let hash1 = compute_run_id("BouncingBall", &options(3.0));
        let hash2 = compute_run_id("BouncingBall", &options(3.0));
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let base = compute_run_id("BouncingBall", &options(3.0));
        assert_ne!(base, compute_run_id("Dahlquist", &options(3.0)));
        assert_ne!(base, compute_run_id("BouncingBall", &options(4.0)));

        let table = InputTable::new(vec!["u".into()], vec![0.0, 1.0], vec![vec![0.0, 1.0]]).unwrap();
        let with_input = SimOptions {
            input: Some(table),
            ..options(3.0)
        };
        assert_ne!(base, compute_run_id("BouncingBall", &with_input));
    }
}
