//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const POLICY: &str = r#"{
    "defaultMaxReplicas": 50,
    "intensityBands": [
        {"upperThreshold": 40, "maxReplicas": 80},
        {"upperThreshold": 90, "maxReplicas": 20},
        {"upperThreshold": 100, "maxReplicas": 10}
    ]
}"#;

const FORECAST: &str = r#"[
    {"timestamp": "2024-03-01T12:35:00Z", "duration": 5, "value": 67.0},
    {"timestamp": "2024-03-01T12:40:00Z", "duration": 5, "value": 95.0}
]"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

fn cas(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cas"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("Output should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = cas(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Carbon Aware Scaler"), "Should show app name");
    assert!(stdout.contains("evaluate"), "Should show evaluate command");
    assert!(stdout.contains("band"), "Should show band command");
    assert!(stdout.contains("next-tick"), "Should show next-tick command");
    assert!(stdout.contains("status"), "Should show status command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = cas(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("cas"), "Should show binary name");
}

#[test]
fn test_evaluate_resolves_band() {
    let policy = write_temp(POLICY);
    let forecast = write_temp(FORECAST);

    let output = cas(&[
        "--format",
        "json",
        "evaluate",
        "--policy",
        policy.path().to_str().unwrap(),
        "--forecast",
        forecast.path().to_str().unwrap(),
        "--now",
        "2024-03-01T12:37:00Z",
    ]);

    assert!(output.status.success(), "Evaluate should succeed");
    let decision = json(&output);
    assert_eq!(decision["max_replicas"], 20);
    assert_eq!(decision["overridden"], false);
    assert_eq!(decision["intensity"], 67.0);
    assert_eq!(decision["next_evaluation_secs"], 180.0);
}

#[test]
fn test_evaluate_yields_to_demand() {
    let policy = write_temp(POLICY);
    let forecast = write_temp(FORECAST);

    let output = cas(&[
        "evaluate",
        "--policy",
        policy.path().to_str().unwrap(),
        "--forecast",
        forecast.path().to_str().unwrap(),
        "--now",
        "2024-03-01T12:37:00Z",
        "--desired",
        "30",
        "--format",
        "json",
    ]);

    assert!(output.status.success(), "Evaluate should succeed");
    let decision = json(&output);
    assert_eq!(decision["max_replicas"], 50);
    assert_eq!(decision["overridden"], true);
    assert_eq!(decision["trigger"], "demand");
}

#[test]
fn test_evaluate_without_covering_sample_fails() {
    let policy = write_temp(POLICY);
    let forecast = write_temp(FORECAST);

    let output = cas(&[
        "evaluate",
        "--policy",
        policy.path().to_str().unwrap(),
        "--forecast",
        forecast.path().to_str().unwrap(),
        "--now",
        "2024-03-02T00:00:00Z",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no forecast data"));
}

#[test]
fn test_band_falls_back_to_last_band() {
    let policy = write_temp(POLICY);

    let output = cas(&[
        "band",
        "--policy",
        policy.path().to_str().unwrap(),
        "--intensity",
        "250",
        "--format",
        "json",
    ]);

    assert!(output.status.success(), "Band should succeed");
    assert_eq!(json(&output)["max_replicas"], 10);
}

#[test]
fn test_band_table_marks_the_resolved_band() {
    let policy = write_temp(POLICY);

    let output = Command::new(env!("CARGO_BIN_EXE_cas"))
        .env("NO_COLOR", "1")
        .args([
            "band",
            "--policy",
            policy.path().to_str().unwrap(),
            "--intensity",
            "0",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Band should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let row = |threshold: &str| {
        stdout
            .lines()
            .find(|line| line.contains(&format!("│ {} ", threshold)))
            .unwrap_or_else(|| panic!("Missing row for {}", threshold))
            .to_string()
    };

    // Zero lies outside the first band and falls back to the last one
    assert!(!row("40").contains('✓'));
    assert!(row("100").contains('✓'));
    assert!(stdout.contains("selects max replicas 10"));
}

#[test]
fn test_next_tick_aligns_to_boundary() {
    let output = cas(&[
        "next-tick",
        "--granularity",
        "15",
        "--now",
        "2024-03-01T12:37:30Z",
        "--format",
        "json",
    ]);

    assert!(output.status.success(), "Next tick should succeed");
    let tick = json(&output);
    assert_eq!(tick["delay_secs"], 450.0);
    assert_eq!(tick["next_evaluation_at"], "2024-03-01T12:45:00Z");
}

#[test]
fn test_rejects_malformed_instant() {
    let output = cas(&["next-tick", "--now", "noon"]);
    assert!(!output.status.success());
}

#[test]
fn test_status_reports_unreachable_scaler() {
    let output = cas(&["--api-url", "http://127.0.0.1:1", "status"]);
    assert!(!output.status.success());
}
