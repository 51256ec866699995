//! Integration tests for the jejum binary.
//!
//! These tests verify end-to-end behavior including:
//! - The start/pause/resume/stop workflow
//! - History archiving and statistics
//! - Water and weight tracking
//! - Recovery from corrupted store files
//!
//! Time is pinned with the hidden `--at` flag so every run is deterministic.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// 2024-06-01 12:00 UTC
const T0: i64 = 1_717_243_200_000;
const SECOND: i64 = 1_000;
const HOUR: i64 = 3_600_000;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("jejum"))
}

/// Run a subcommand against `data_dir` at a fixed instant
fn jejum_at(data_dir: &Path, at: i64, args: &[&str]) -> assert_cmd::assert::Assert {
    cli()
        .args(args)
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--at")
        .arg(at.to_string())
        .assert()
}

fn read_history(data_dir: &Path) -> Vec<serde_json::Value> {
    let raw = fs::read_to_string(data_dir.join("fastingHistory.json"))
        .expect("Failed to read history");
    serde_json::from_str(&raw).expect("History is not a JSON array")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Intermittent fasting tracker"));
}

#[test]
fn test_fresh_status_is_idle_with_default_plan() {
    let temp_dir = setup_test_dir();

    jejum_at(temp_dir.path(), T0, &["status"])
        .success()
        .stdout(predicate::str::contains("Status: idle"))
        .stdout(predicate::str::contains("16:8"));
}

#[test]
fn test_start_and_status_countdown() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"])
        .success()
        .stdout(predicate::str::contains("Fasting started"));
    assert!(data_dir.join("fastingSession.json").exists());

    jejum_at(data_dir, T0 + 4 * HOUR, &["status"])
        .success()
        .stdout(predicate::str::contains("Status: fasting"))
        .stdout(predicate::str::contains("Elapsed: 04:00:00"))
        .stdout(predicate::str::contains("Remaining: 12:00:00"))
        .stdout(predicate::str::contains("25%"));
}

#[test]
fn test_second_start_is_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(data_dir, T0 + HOUR, &["start"])
        .success()
        .stdout(predicate::str::contains("already in progress"));

    // The original start time is kept
    jejum_at(data_dir, T0 + HOUR, &["status"])
        .success()
        .stdout(predicate::str::contains("Elapsed: 01:00:00"));
}

#[test]
fn test_short_fast_not_archived() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(data_dir, T0 + 45 * SECOND, &["stop"])
        .success()
        .stdout(predicate::str::contains("not saved to history"));

    assert!(!data_dir.join("fastingHistory.json").exists());
    jejum_at(data_dir, T0 + 50 * SECOND, &["status"])
        .success()
        .stdout(predicate::str::contains("Status: idle"));
}

#[test]
fn test_ninety_second_fast_archived() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(data_dir, T0 + 90 * SECOND, &["stop"])
        .success()
        .stdout(predicate::str::contains("Saved to history"));

    let history = read_history(data_dir);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["duration"], 90_000);
    assert_eq!(history[0]["completed"], false);

    jejum_at(data_dir, T0 + 100 * SECOND, &["history"])
        .success()
        .stdout(predicate::str::contains("16-8"))
        .stdout(predicate::str::contains("ended early"));
}

#[test]
fn test_pause_resume_extends_end() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(data_dir, T0 + HOUR, &["pause"])
        .success()
        .stdout(predicate::str::contains("Fast paused"));

    // Paused time does not count
    jejum_at(data_dir, T0 + 3 * HOUR, &["status"])
        .success()
        .stdout(predicate::str::contains("Status: paused"))
        .stdout(predicate::str::contains("Elapsed: 01:00:00"));

    jejum_at(data_dir, T0 + 3 * HOUR, &["resume"])
        .success()
        .stdout(predicate::str::contains("resumed after 2h 0m"));

    jejum_at(data_dir, T0 + 3 * HOUR, &["status"])
        .success()
        .stdout(predicate::str::contains("Remaining: 15:00:00"));
}

#[test]
fn test_illegal_commands_are_reported_not_failed() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["pause"])
        .success()
        .stdout(predicate::str::contains("No running fast"));
    jejum_at(data_dir, T0, &["resume"])
        .success()
        .stdout(predicate::str::contains("not paused"));
    jejum_at(data_dir, T0, &["stop"])
        .success()
        .stdout(predicate::str::contains("No fast in progress"));
}

#[test]
fn test_select_plan() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["plan", "18-6"])
        .success()
        .stdout(predicate::str::contains("Selected 18:6"));
    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(data_dir, T0 + 9 * HOUR, &["status"])
        .success()
        .stdout(predicate::str::contains("18:6"))
        .stdout(predicate::str::contains("50%"));

    jejum_at(data_dir, T0, &["plans"])
        .success()
        .stdout(predicate::str::contains("* 18-6"));
}

#[test]
fn test_unknown_plan_fails() {
    let temp_dir = setup_test_dir();

    jejum_at(temp_dir.path(), T0, &["plan", "5-2"])
        .failure()
        .stderr(predicate::str::contains("5-2"));
}

#[test]
fn test_watch_completes_due_fast() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(
        data_dir,
        T0 + 16 * HOUR + SECOND,
        &["watch", "--tick-ms", "0", "--max-ticks", "1"],
    )
    .success()
    .stdout(predicate::str::contains("Fast complete"));

    let history = read_history(data_dir);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["completed"], true);
    assert_eq!(history[0]["duration"], 16 * HOUR + SECOND);
}

#[test]
fn test_watch_honours_max_ticks() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    let output = jejum_at(
        data_dir,
        T0 + HOUR,
        &["watch", "--tick-ms", "0", "--max-ticks", "2"],
    )
    .success()
    .get_output()
    .stdout
    .clone();

    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.matches("15:00:00 remaining").count(), 2);

    jejum_at(data_dir, T0 + HOUR, &["status"])
        .success()
        .stdout(predicate::str::contains("Status: fasting"));
}

#[test]
fn test_watch_idle_returns() {
    let temp_dir = setup_test_dir();

    jejum_at(temp_dir.path(), T0, &["watch", "--tick-ms", "0"])
        .success()
        .stdout(predicate::str::contains("No fast in progress"));
}

#[test]
fn test_stats_after_completed_fast() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(data_dir, T0 + 2 * HOUR, &["stop", "--completed"])
        .success()
        .stdout(predicate::str::contains("completed"));

    jejum_at(data_dir, T0 + 2 * HOUR, &["stats"])
        .success()
        .stdout(predicate::str::contains("Fasts: 1"))
        .stdout(predicate::str::contains("Completed: 1 (100%)"))
        .stdout(predicate::str::contains("Total fasting: 2h 0m"))
        .stdout(predicate::str::contains("Current streak: 1 day"))
        .stdout(predicate::str::contains("Beginner (0/3 fasts)"))
        .stdout(predicate::str::contains("✓ Complete your first fast"));
}

#[test]
fn test_water_is_additive() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["water", "add", "200"])
        .success()
        .stdout(predicate::str::contains("Water today: 200 / 2500 ml"));
    jejum_at(data_dir, T0 + 60 * SECOND, &["water", "add", "300"])
        .success()
        .stdout(predicate::str::contains("Water today: 500 / 2500 ml (20%)"));

    jejum_at(data_dir, T0 + 60 * SECOND, &["water", "status"])
        .success()
        .stdout(predicate::str::contains("500 ml"));
}

#[test]
fn test_weight_updates_water_goal() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["weight", "80"])
        .success()
        .stdout(predicate::str::contains("Weight recorded: 80.0 kg"));
    jejum_at(data_dir, T0, &["water", "status"])
        .success()
        .stdout(predicate::str::contains("/ 2640 ml"));
}

#[test]
fn test_onboard_selects_recommended_plan() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(
        data_dir,
        T0,
        &[
            "onboard",
            "--name",
            "Ana",
            "--goal",
            "weightloss",
            "--activity",
            "moderate",
            "--height",
            "170",
            "--weight",
            "72",
        ],
    )
    .success()
    .stdout(predicate::str::contains("Welcome, Ana"))
    .stdout(predicate::str::contains("Recommended plan: 18:6"))
    .stdout(predicate::str::contains("BMI: 24.9"));

    jejum_at(data_dir, T0, &["status"])
        .success()
        .stdout(predicate::str::contains("18:6"));
}

#[test]
fn test_onboard_keeps_recorded_weight() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["weight", "80"]).success();
    jejum_at(
        data_dir,
        T0,
        &["onboard", "--name", "Ana", "--goal", "health"],
    )
    .success()
    .stdout(predicate::str::contains("Daily water goal: 2640 ml"));

    let raw = fs::read_to_string(data_dir.join("userData.json")).unwrap();
    let profile: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(profile["weight"], 80.0);
    assert_eq!(profile["name"], "Ana");
}

#[test]
fn test_onboard_rejects_unknown_goal() {
    let temp_dir = setup_test_dir();

    jejum_at(
        temp_dir.path(),
        T0,
        &["onboard", "--name", "Ana", "--goal", "bulking"],
    )
    .failure()
    .stderr(predicate::str::contains("unknown goal"));
}

#[test]
fn test_reset_requires_confirmation() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    jejum_at(data_dir, T0, &["start"]).success();
    jejum_at(data_dir, T0, &["reset"]).failure();
    assert!(data_dir.join("fastingSession.json").exists());

    jejum_at(data_dir, T0, &["reset", "--yes"])
        .success()
        .stdout(predicate::str::contains("All data deleted"));
    assert!(!data_dir.join("fastingSession.json").exists());
    assert!(!data_dir.join("currentPlan.json").exists());
}
