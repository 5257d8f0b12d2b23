// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;

/// Resolve state directory: PULSE_STATE_DIR > XDG_STATE_HOME/pulse > ~/.local/state/pulse
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("PULSE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("pulse"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/pulse"))
}

/// Explicit override for where the check plan is read from; falls back to
/// `<state-dir>/plan.json` when unset.
pub fn plan_path_override() -> Option<PathBuf> {
    std::env::var("PULSE_PLAN_PATH").ok().map(PathBuf::from)
}

/// Ensure-loop interval override, mainly useful for manual testing.
pub fn ensure_interval_ms() -> Option<Duration> {
    std::env::var("PULSE_ENSURE_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
