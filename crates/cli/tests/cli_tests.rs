//! CLI integration tests

use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

fn run_rbf(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-p", "rbf-cli", "--quiet", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// A small trace with one learn/check episode: five learn samples, one
/// anomalous check sample and one normal one.
fn episode_trace() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "10:00:00 PercentileBasedFinder (learn): [10, 20]").unwrap();
    writeln!(file, "10:00:05 PercentileBasedFinder (learn): [20, 21]").unwrap();
    writeln!(file, "10:00:10 PercentileBasedFinder (learn): [30, 22]").unwrap();
    writeln!(file, "10:00:15 PercentileBasedFinder (learn): [40, 23]").unwrap();
    writeln!(file, "10:00:20 PercentileBasedFinder (learn): [50, 24]").unwrap();
    writeln!(file, "10:00:25 PercentileBasedFinder (check): [90, 20]").unwrap();
    writeln!(file, "10:00:30 PercentileBasedFinder (check): [10, 20]").unwrap();
    writeln!(file, "10:00:35 PercentileBasedFinder Detected anomaly").unwrap();
    file
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_rbf(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Bottleneck finder"),
        "Should show app description"
    );
    assert!(stdout.contains("percentile"), "Should show percentile command");
    assert!(stdout.contains("importance"), "Should show importance command");
    assert!(stdout.contains("trend"), "Should show trend command");
    assert!(stdout.contains("evaluate"), "Should show evaluate command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_rbf(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("rbf"), "Should show binary name");
}

/// Test percentile subcommand help
#[test]
fn test_percentile_help() {
    let output = run_rbf(&["percentile", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Percentile help should succeed");
    assert!(stdout.contains("--file"), "Should show file option");
    assert!(stdout.contains("--limit"), "Should show limit option");
    assert!(stdout.contains("--percentile"), "Should show percentile option");
    assert!(stdout.contains("RBF_TRACE_FILE"), "Should show env var");
}

/// Test importance subcommand help
#[test]
fn test_importance_help() {
    let output = run_rbf(&["importance", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Importance help should succeed");
    assert!(stdout.contains("--tail"), "Should show tail option");
    assert!(stdout.contains("--warmup"), "Should show warmup option");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = run_rbf(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = run_rbf(&["percentile"]);
    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test that a non-positive limit is rejected
#[test]
fn test_rejects_non_positive_limit() {
    let trace = episode_trace();
    let output = run_rbf(&[
        "evaluate",
        "--file",
        trace.path().to_str().unwrap(),
        "--limit",
        "0",
    ]);
    assert!(!output.status.success(), "Zero limit should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("positive"), "Should explain the limit rule");
}

/// Replay the episode trace and check the flagged sample is reported
#[test]
fn test_percentile_replay_flags_anomalous_check() {
    let trace = episode_trace();
    let output = run_rbf(&[
        "percentile",
        "--file",
        trace.path().to_str().unwrap(),
        "--limit",
        "100",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Percentile replay should succeed");
    assert!(
        stdout.contains("episode 1 thresholds"),
        "Should print the learned thresholds"
    );
    assert!(
        stdout.contains("2 check samples scored, 1 flagged"),
        "Should flag exactly one of the two check samples: {}",
        stdout
    );
}

/// Evaluate the episode trace: one identified episode, one true anomaly
#[test]
fn test_evaluate_reports_perfect_scores() {
    let trace = episode_trace();
    let output = run_rbf(&[
        "--format",
        "json",
        "evaluate",
        "--file",
        trace.path().to_str().unwrap(),
        "--limit",
        "100",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Evaluate should succeed");
    assert!(stdout.contains("\"anomalous_events\": 1"), "{}", stdout);
    assert!(stdout.contains("\"identified_events\": 1"), "{}", stdout);
    assert!(stdout.contains("\"correct_identifications\": 1"), "{}", stdout);
    assert!(stdout.contains("\"precision\": 100.0"), "{}", stdout);
}

/// Trend over vector rows marks early rows as insufficient
#[test]
fn test_trend_reports_insufficient_early_rows() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    for i in 0..6u32 {
        let x0 = 1 + (i % 3);
        let x1 = 2 + (i % 2) * 3;
        writeln!(
            file,
            "Finder Response time vector: [{}, {}, {}]",
            x0,
            x1,
            x0 + x1 + 1
        )
        .unwrap();
    }

    let output = run_rbf(&["trend", "--file", file.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Trend should succeed");
    assert!(
        stdout.contains("Relative importance trend for API0"),
        "{}",
        stdout
    );
    assert!(stdout.contains("insufficient data"), "{}", stdout);
}
