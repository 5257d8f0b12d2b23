//! Test helpers for black-box specifications of the `pulsed` binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

pub fn pulsed_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("pulsed")
}

/// Poll a condition until it returns true or `timeout_ms` elapses.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);
    let poll_interval = Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// A running `pulsed` process, with its isolated state directory kept alive
/// alongside it.
pub struct RunningDaemon {
    child: Child,
    stdout: BufReader<std::process::ChildStdout>,
    state_dir: tempfile::TempDir,
}

impl RunningDaemon {
    /// Spawn `pulsed` against a fresh, empty state directory and block until
    /// it prints its `READY` line (or panic after `SPEC_WAIT_MAX_MS`).
    pub fn start() -> Self {
        Self::start_with_plan(None)
    }

    /// Spawn `pulsed` with a plan file seeded at `<state-dir>/plan.json`.
    pub fn start_with_plan(plan_json: Option<&str>) -> Self {
        let state_dir = tempfile::tempdir().unwrap();
        if let Some(plan) = plan_json {
            std::fs::write(state_dir.path().join("plan.json"), plan).unwrap();
        }

        let mut child = Command::new(pulsed_binary())
            .env("PULSE_STATE_DIR", state_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("pulsed should spawn");

        let mut stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        let mut line = String::new();
        stdout.read_line(&mut line).expect("pulsed should print READY");
        assert_eq!(line.trim(), "READY", "unexpected first line from pulsed: {line:?}");

        Self { child, stdout, state_dir }
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir.path().join("state.json")
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Send SIGTERM and wait (bounded) for a clean exit.
    pub fn terminate(mut self) -> std::process::ExitStatus {
        send_signal(self.pid(), "-TERM");
        wait_for_exit(&mut self.child)
    }

    /// Drain any remaining stdout, for failure diagnostics.
    pub fn remaining_stdout(&mut self) -> String {
        let mut buf = String::new();
        let _ = self.stdout.read_to_string(&mut buf);
        buf
    }
}

impl Drop for RunningDaemon {
    fn drop(&mut self) {
        let _ = send_signal(self.child.id(), "-KILL");
        let _ = self.child.wait();
    }
}

fn send_signal(pid: u32, flag: &str) {
    let _ = Command::new("kill")
        .args([flag, &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

fn wait_for_exit(child: &mut Child) -> std::process::ExitStatus {
    let deadline = std::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    loop {
        if let Some(status) = child.try_wait().expect("try_wait should not fail") {
            return status;
        }
        if std::time::Instant::now() >= deadline {
            panic!("pulsed did not exit within {SPEC_WAIT_MAX_MS}ms of SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS));
    }
}

pub fn pulsed_cmd_in(state_dir: &Path) -> Command {
    let mut cmd = Command::new(pulsed_binary());
    cmd.env("PULSE_STATE_DIR", state_dir);
    cmd
}
