//! Basic CLI E2E tests.
//!
//! Tests run the built binary against a throwaway data directory with a
//! pinned `--now`, and verify outputs.

use std::path::Path;
use std::process::Command;

const NOW: &str = "2024-07-02T09:00:00Z";

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_napcast"))
        .env("NAPCAST_DATA_DIR", data_dir)
        .env_remove("NAPCAST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let stdout = run_ok(data_dir, args);
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn with_profile() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    run_ok(
        dir.path(),
        &["profile", "set", "--name", "Ada", "--birth-date", "2024-01-01", "--now", NOW],
    );
    dir
}

#[test]
fn test_profile_show_json() {
    let dir = with_profile();
    let out = run_json(dir.path(), &["profile", "show", "--json", "--now", NOW]);
    assert_eq!(out["profile"]["name"], "Ada");
    assert_eq!(out["baseline"]["id"], "5_7m");
}

#[test]
fn test_profile_requires_birth_date() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["profile", "set", "--name", "Ada"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_session_add_and_list() {
    let dir = with_profile();
    run_ok(
        dir.path(),
        &[
            "session", "add", "--start", "2024-07-02T07:30:00Z", "--end", "2024-07-02T09:00:00Z",
            "--quality", "4", "--now", NOW,
        ],
    );

    let list = run_json(dir.path(), &["session", "list", "--json", "--now", NOW]);
    let sessions = list.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["quality"], 4);
    assert_eq!(sessions[0]["source"], "manual");
}

#[test]
fn test_session_add_rejects_inverted_range() {
    let dir = with_profile();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["session", "add", "--start", "10:00", "--end", "09:00", "--now", NOW],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_timer_start_stop() {
    let dir = with_profile();
    run_ok(dir.path(), &["session", "start", "--now", "2024-07-02T10:00:00Z"]);
    let (_, _, code) = run_cli(dir.path(), &["session", "start", "--now", "2024-07-02T10:05:00Z"]);
    assert_eq!(code, 1, "second start should fail while running");
    run_ok(dir.path(), &["session", "stop", "--now", "2024-07-02T10:45:00Z"]);

    let list = run_json(dir.path(), &["session", "list", "--json", "--now", NOW]);
    assert_eq!(list[0]["source"], "timer");
    assert_eq!(list[0]["start"], "2024-07-02T10:00:00Z");
    assert_eq!(list[0]["end"], "2024-07-02T10:45:00Z");

    let (_, _, code) = run_cli(dir.path(), &["session", "stop", "--now", "2024-07-02T11:00:00Z"]);
    assert_eq!(code, 1, "stop without a running timer should fail");
}

#[test]
fn test_session_delete_hides_session() {
    let dir = with_profile();
    run_ok(
        dir.path(),
        &["session", "add", "--start", "07:30", "--end", "09:00", "--now", NOW],
    );
    let list = run_json(dir.path(), &["session", "list", "--json", "--now", NOW]);
    let id = list[0]["id"].as_str().unwrap().to_string();

    run_ok(dir.path(), &["session", "delete", &id, "--now", NOW]);
    let list = run_json(dir.path(), &["session", "list", "--all", "--json", "--now", NOW]);
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_learn_json() {
    let dir = with_profile();
    run_ok(
        dir.path(),
        &["session", "add", "--start", "07:30", "--end", "09:00", "--now", NOW],
    );
    let state = run_json(dir.path(), &["learn", "--json", "--now", NOW]);
    assert_eq!(state["ewma_nap_length_min"], 90.0);
    assert_eq!(state["ewma_wake_window_min"], 135.0);
}

#[test]
fn test_learn_cached_reads_last_state() {
    let dir = with_profile();
    let (_, stderr, code) = run_cli(dir.path(), &["learn", "--cached", "--now", NOW]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no cached learner state"));

    run_ok(
        dir.path(),
        &["session", "add", "--start", "07:30", "--end", "09:00", "--now", NOW],
    );
    run_ok(dir.path(), &["learn", "--now", NOW]);
    // a later session is not reflected until the next recompute
    run_ok(
        dir.path(),
        &["session", "add", "--start", "11:00", "--end", "11:30", "--now", NOW],
    );
    let cached = run_json(dir.path(), &["learn", "--cached", "--json", "--now", NOW]);
    assert_eq!(cached["ewma_nap_length_min"], 90.0);
    assert_eq!(cached["last_updated"], "2024-07-02T09:00:00Z");
}

#[test]
fn test_huge_lookback_is_rejected() {
    let dir = with_profile();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["config", "set", "learner.lookback_days", "200000000"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("lookback_days"));
    run_ok(dir.path(), &["learn", "--now", NOW]);
}

#[test]
fn test_schedule_show_json() {
    let dir = with_profile();
    run_ok(
        dir.path(),
        &["session", "add", "--start", "07:30", "--end", "09:00", "--now", NOW],
    );

    let blocks = run_json(dir.path(), &["schedule", "show", "--json", "--now", NOW]);
    let blocks = blocks.as_array().unwrap();
    assert!(!blocks.is_empty());
    // wake window 135 after 09:00, minus 20 minutes of wind-down
    assert_eq!(blocks[0]["kind"], "windDown");
    assert_eq!(blocks[0]["start"], "2024-07-02T10:55:00Z");
    assert!(blocks.iter().any(|b| b["kind"] == "bedtime"));
}

#[test]
fn test_schedule_requires_profile() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["schedule", "show", "--now", NOW]);
    assert_eq!(code, 1);
    assert!(stderr.contains("profile"));
}

#[test]
fn test_what_if_offsets() {
    let dir = with_profile();
    let blocks = run_json(
        dir.path(),
        &["schedule", "what-if", "--offset", "-15", "--json", "--now", NOW],
    );
    // no history: baseline wake window 135, shifted by -15
    assert_eq!(blocks[0]["start"], "2024-07-02T10:40:00Z");

    let (_, _, code) = run_cli(dir.path(), &["schedule", "what-if", "--offset", "7", "--now", NOW]);
    assert_eq!(code, 1);
}

#[test]
fn test_coach_without_data() {
    let dir = with_profile();
    let insights = run_json(dir.path(), &["coach", "--json", "--now", NOW]);
    assert_eq!(insights[0]["id"], "coach_no_data");
}

#[test]
fn test_notify_plan_json() {
    let dir = with_profile();
    let plan = run_json(dir.path(), &["notify", "plan", "--json", "--now", NOW]);
    let plan = plan.as_array().unwrap();
    assert!(!plan.is_empty());
    assert!(plan[0]["id"].as_str().unwrap().starts_with("notif_sched_"));

    run_ok(dir.path(), &["config", "set", "notifications.enabled", "false"]);
    let plan = run_json(dir.path(), &["notify", "plan", "--json", "--now", NOW]);
    assert!(plan.as_array().unwrap().is_empty());
}

#[test]
fn test_stats_week_json() {
    let dir = with_profile();
    run_ok(
        dir.path(),
        &["session", "add", "--start", "07:30", "--end", "09:00", "--now", NOW],
    );
    let totals = run_json(dir.path(), &["stats", "week", "--json", "--now", NOW]);
    let totals = totals.as_array().unwrap();
    assert_eq!(totals.len(), 7);
    assert_eq!(totals[6]["date"], "2024-07-02");
    assert_eq!(totals[6]["total_minutes"], 90);
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(dir.path(), &["config", "get", "schedule.horizon_days"]).trim(), "2");
    run_ok(dir.path(), &["config", "set", "schedule.horizon_days", "3"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "schedule.horizon_days"]).trim(), "3");

    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "schedule.bogus", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    run_ok(dir.path(), &["config", "reset"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "schedule.horizon_days"]).trim(), "2");
}

#[test]
fn test_reset_requires_confirmation() {
    let dir = with_profile();
    run_ok(
        dir.path(),
        &["session", "add", "--start", "07:30", "--end", "09:00", "--now", NOW],
    );
    let (_, stderr, code) = run_cli(dir.path(), &["reset", "--now", NOW]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--yes"));

    run_ok(dir.path(), &["reset", "--yes", "--now", NOW]);
    let list = run_json(dir.path(), &["session", "list", "--all", "--json", "--now", NOW]);
    assert!(list.as_array().unwrap().is_empty());
    let (_, stderr, code) = run_cli(dir.path(), &["profile", "show", "--now", NOW]);
    assert_eq!(code, 1);
    assert!(stderr.contains("profile"));
}

#[test]
fn test_completions() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(dir.path(), &["completions", "bash"]);
    assert!(out.contains("napcast"));
}
