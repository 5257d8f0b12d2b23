//! Start/stop lifecycle specs for the `pulsed` binary.

use crate::prelude::*;

#[test]
fn daemon_prints_ready_and_shuts_down_cleanly_on_sigterm() {
    let daemon = RunningDaemon::start();
    let status = daemon.terminate();
    assert!(status.success(), "pulsed should exit 0 on SIGTERM");
}

#[test]
fn daemon_checkpoints_state_on_shutdown() {
    let daemon = RunningDaemon::start();
    let state_path = daemon.state_path();
    let status = daemon.terminate();
    assert!(status.success());

    let found = wait_for(SPEC_WAIT_MAX_MS, || state_path.exists());
    assert!(found, "state.json should exist after a clean shutdown");

    let contents = std::fs::read_to_string(&state_path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(doc.get("changes").is_some());
    assert!(doc.get("tasks").is_some());
}

#[cfg(unix)]
#[test]
fn daemon_checkpoint_file_is_mode_0600() {
    use std::os::unix::fs::PermissionsExt;

    let daemon = RunningDaemon::start();
    let state_path = daemon.state_path();
    let status = daemon.terminate();
    assert!(status.success());

    wait_for(SPEC_WAIT_MAX_MS, || state_path.exists());
    let mode = std::fs::metadata(&state_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
