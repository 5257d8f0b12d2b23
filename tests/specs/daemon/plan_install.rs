//! Spec: a seeded plan file is installed and drives a check task.

use crate::prelude::*;

const ONE_CHECK_PLAN: &str = r#"[
  {
    "name": "web",
    "level": "ready",
    "startup": "enabled",
    "period": {"secs": 0, "nanos": 50000000},
    "timeout": {"secs": 0, "nanos": 20000000},
    "threshold": 1,
    "probe": {"kind": "tcp", "host": "127.0.0.1", "port": 1}
  }
]"#;

#[test]
fn seeded_plan_spawns_a_perform_check_task() {
    let daemon = RunningDaemon::start_with_plan(Some(ONE_CHECK_PLAN));
    let state_path = daemon.state_path();
    let status = daemon.terminate();
    assert!(status.success());

    wait_for(SPEC_WAIT_MAX_MS, || state_path.exists());
    let contents = std::fs::read_to_string(&state_path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&contents).unwrap();

    let tasks = doc.get("tasks").and_then(|v| v.as_object()).unwrap();
    assert!(!tasks.is_empty(), "at least one driving task should have been recorded");

    let kinds: Vec<&str> = tasks.values().filter_map(|t| t.get("kind").and_then(|k| k.as_str())).collect();
    assert!(
        kinds.iter().any(|k| *k == "perform-check" || *k == "recover-check"),
        "expected a perform-check or recover-check task, got {kinds:?}"
    );
}

#[test]
fn daemon_with_no_plan_file_starts_with_no_tasks() {
    let daemon = RunningDaemon::start();
    let state_path = daemon.state_path();
    let status = daemon.terminate();
    assert!(status.success());

    wait_for(SPEC_WAIT_MAX_MS, || state_path.exists());
    let contents = std::fs::read_to_string(&state_path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let tasks = doc.get("tasks").and_then(|v| v.as_object()).unwrap();
    assert!(tasks.is_empty());
}
