//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(dir: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_focustimer"))
        .args(args)
        .env("FOCUSTIMER_DATA_DIR", dir.path())
        .env_remove("FOCUSTIMER_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(dir: &TempDir, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

fn parse_json(output: &str) -> serde_json::Value {
    serde_json::from_str(output).expect("Failed to parse JSON output")
}

#[test]
fn test_config_list_has_default_types() {
    let dir = TempDir::new().unwrap();
    let config = parse_json(&run_cli_success(&dir, &["config", "list"]));

    let types = config["timer"]["types"].as_array().unwrap();
    assert_eq!(types.len(), 2);
    assert_eq!(types[0]["id"], "study");
    assert_eq!(types[0]["duration"], 2700);
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_persists() {
    let dir = TempDir::new().unwrap();
    run_cli_success(&dir, &["config", "set", "timer.auto_switch", "true"]);
    let value = run_cli_success(&dir, &["config", "get", "timer.auto_switch"]);
    assert_eq!(value.trim(), "true");

    let (_, _, code) = run_cli(&dir, &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_builtin_type_cannot_be_removed() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["config", "type", "remove", "study"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("built in"));

    run_cli_success(
        &dir,
        &["config", "type", "add", "reading", "Reading", "--minutes", "20"],
    );
    run_cli_success(&dir, &["config", "type", "select", "reading"]);
    let current = run_cli_success(&dir, &["config", "get", "timer.current_type"]);
    assert_eq!(current.trim(), "reading");
}

#[test]
fn test_timer_run_records_session() {
    let dir = TempDir::new().unwrap();
    let stdout = run_cli_success(
        &dir,
        &["timer", "run", "study", "--duration", "1", "--json"],
    );

    let events: Vec<serde_json::Value> = stdout.lines().map(parse_json).collect();
    assert_eq!(events[0]["type"], "started");
    assert!(events.iter().any(|e| {
        e["type"] == "finished" && e["completed"] == true && e["elapsed_seconds"] == 1
    }));

    let sessions = parse_json(&run_cli_success(&dir, &["sessions", "list"]));
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["actual_duration"], 1);

    let notice = events.iter().find(|e| e["type"] == "notify").unwrap();
    assert_eq!(notice["timer_name"], "Study");
    assert_eq!(notice["session_id"], sessions[0]["id"]);

    let today = parse_json(&run_cli_success(&dir, &["stats", "today"]));
    assert_eq!(today["session_count"], 1);
    assert_eq!(today["total_study_time"], 1);
}

#[test]
fn test_timer_run_unknown_type_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["timer", "run", "juggling"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown timer type"));
}

#[test]
fn test_todo_lifecycle() {
    let dir = TempDir::new().unwrap();
    let low = parse_json(&run_cli_success(&dir, &["todo", "add", "Low"]));
    let high = parse_json(&run_cli_success(
        &dir,
        &["todo", "add", "High", "--priority", "3"],
    ));

    let items = parse_json(&run_cli_success(&dir, &["todo", "list"]));
    assert_eq!(items[0]["id"], high["id"]);
    assert_eq!(items[1]["id"], low["id"]);

    let high_id = high["id"].to_string();
    run_cli_success(&dir, &["todo", "done", &high_id]);
    let open = parse_json(&run_cli_success(&dir, &["todo", "list"]));
    assert_eq!(open.as_array().unwrap().len(), 1);

    let all = parse_json(&run_cli_success(&dir, &["todo", "list", "--all"]));
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[test]
fn test_stats_and_data_commands_on_empty_db() {
    let dir = TempDir::new().unwrap();
    let series = parse_json(&run_cli_success(&dir, &["stats", "series", "--days", "3"]));
    assert_eq!(series.as_array().unwrap().len(), 3);

    let total = parse_json(&run_cli_success(&dir, &["stats", "total"]));
    assert_eq!(total["total_study_time"], 0);

    let summary = parse_json(&run_cli_success(&dir, &["data", "clean"]));
    assert_eq!(summary["sessions_deleted"], 0);
}

#[test]
fn test_sessions_show_missing_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["sessions", "show", "42"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    let script = run_cli_success(&dir, &["completions", "bash"]);
    assert!(script.contains("focustimer"));
}
