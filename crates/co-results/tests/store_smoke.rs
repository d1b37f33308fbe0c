use co_core::RunStats;
use co_model::{ScalarValue, ValueBuffer, VariableType};
use co_results::*;
use co_sim::{SimOptions, StopReason, Trajectory};

fn manifest(run_id: &str, model_name: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        model_name: model_name.to_string(),
        timestamp: timestamp.to_string(),
        options: SimOptions::default(),
        stop_reason: StopReason::Finished,
        final_time: 1.0,
        stats: RunStats::default(),
        names: vec!["x".into(), "flag".into()],
        types: vec![VariableType::Float64, VariableType::Boolean],
        rows: 2,
    }
}

fn trajectory() -> Trajectory {
    let mut trajectory = Trajectory::new(
        vec!["x".into(), "flag".into()],
        vec![VariableType::Float64, VariableType::Boolean],
    );
    trajectory.time = vec![0.0, 1.0];
    trajectory.columns = vec![
        ValueBuffer::Float64(vec![1.0, 0.5]),
        ValueBuffer::Boolean(vec![true, false]),
    ];
    trajectory
}

#[test]
fn save_and_load_run() {
    let temp_dir = std::env::temp_dir().join("co_results_test");
    let _ = std::fs::remove_dir_all(&temp_dir);

    let store = RunStore::new(temp_dir.clone()).unwrap();
    let manifest = manifest("test_run_123", "Dahlquist", "2026-02-25T12:00:00Z");
    store.save_run(&manifest, &trajectory()).unwrap();

    let loaded_manifest = store.load_manifest("test_run_123").unwrap();
    assert_eq!(loaded_manifest.run_id, manifest.run_id);
    assert_eq!(loaded_manifest.names, ["x", "flag"]);

    let loaded = store.load_trajectory("test_run_123").unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.time, [0.0, 1.0]);
    assert_eq!(
        loaded.row(0),
        Some(vec![ScalarValue::Float64(1.0), ScalarValue::Boolean(true)])
    );

    assert!(matches!(
        store.load_manifest("missing"),
        Err(ResultsError::RunNotFound { .. })
    ));
}

#[test]
fn list_runs_by_model() {
    let temp_dir = std::env::temp_dir().join("co_results_test_list");
    let _ = std::fs::remove_dir_all(&temp_dir);

    let store = RunStore::new(temp_dir.clone()).unwrap();
    let empty = Trajectory::new(Vec::new(), Vec::new());

    store
        .save_run(&manifest("run2", "Stair", "2026-02-25T13:00:00Z"), &empty)
        .unwrap();
    store
        .save_run(&manifest("run1", "Stair", "2026-02-25T12:00:00Z"), &empty)
        .unwrap();
    store
        .save_run(&manifest("run3", "VanDerPol", "2026-02-25T14:00:00Z"), &empty)
        .unwrap();

    let stair_runs = store.list_runs("Stair").unwrap();
    let ids: Vec<&str> = stair_runs.iter().map(|m| m.run_id.as_str()).collect();
    assert_eq!(ids, ["run1", "run2"]);

    let vdp_runs = store.list_runs("VanDerPol").unwrap();
    assert_eq!(vdp_runs.len(), 1);
}
