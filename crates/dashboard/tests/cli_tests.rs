//! CLI integration tests

use std::process::{Command, Output};

fn gpu_spend(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gpu-spend"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute gpu-spend")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help() {
    let output = gpu_spend(&["--help"]);
    let text = stdout(&output);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(text.contains("GPU Spend Intelligence"), "Should show app name");
    for command in ["live", "experiments", "leaderboard", "pricing", "history", "epochs"] {
        assert!(text.contains(command), "Should show {} command", command);
    }
}

#[test]
fn test_cli_version() {
    let output = gpu_spend(&["--version"]);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout(&output).contains("gpu-spend"), "Should show binary name");
}

#[test]
fn test_live_help_lists_options() {
    let output = gpu_spend(&["live", "--help"]);
    let text = stdout(&output);

    assert!(output.status.success());
    assert!(text.contains("--duration"));
    assert!(text.contains("--budget"));
}

#[test]
fn test_pricing_json_is_filtered_by_provider() {
    let output = gpu_spend(&["pricing", "--provider", "gcp", "--format", "json"]);
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row["provider"] == "gcp"));
}

#[test]
fn test_experiments_json_respects_limit_and_status() {
    let output = gpu_spend(&[
        "experiments",
        "--status",
        "completed",
        "--limit",
        "5",
        "--seed",
        "42",
        "--format",
        "json",
    ]);
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert!(records.len() <= 5);
    assert!(records.iter().all(|r| r["status"] == "completed"));
}

#[test]
fn test_unknown_status_rejected() {
    let output = gpu_spend(&["experiments", "--status", "paused"]);
    assert!(!output.status.success());
}

#[test]
fn test_epochs_for_running_experiment() {
    let output = gpu_spend(&["epochs", "exp-01001", "--seed", "7", "--format", "json"]);
    assert!(output.status.success());

    let epochs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let epochs = epochs.as_array().unwrap();
    assert!(!epochs.is_empty());
    assert_eq!(epochs[0]["epoch"], 1);
}

#[test]
fn test_epochs_for_unknown_experiment_fails() {
    let output = gpu_spend(&["epochs", "exp-99999"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("exp-99999"));
}

#[test]
fn test_history_json_has_projection() {
    let output = gpu_spend(&[
        "history", "--days", "10", "--project", "3", "--seed", "1", "--format", "json",
    ]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["history"].as_array().unwrap().len(), 10);
    assert_eq!(report["projection"].as_array().unwrap().len(), 3);
}

#[test]
fn test_live_json_runs_for_duration() {
    let output = gpu_spend(&[
        "live",
        "--duration",
        "2",
        "--budget",
        "1000",
        "--seed",
        "3",
        "--format",
        "json",
    ]);
    assert!(output.status.success());

    let text = stdout(&output);
    // Each tick is one JSON line; a tiny budget triggers the exceeded alert
    assert!(text.contains("\"experiment_id\""));
    assert!(text.contains("\"exceeded\""));
    assert!(text.contains("\"current_total_spend\""));
}
