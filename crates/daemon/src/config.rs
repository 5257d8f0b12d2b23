// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide configuration: where the state file and check plan live.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory: $HOME is not set")]
    NoStateDir,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub state_path: PathBuf,
    pub plan_path: PathBuf,
}

impl Config {
    /// Resolve every path the daemon needs from the environment. See
    /// [`crate::env`] for the precedence each variable follows.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = crate::env::state_dir()?;
        let state_path = state_dir.join("state.json");
        let plan_path = crate::env::plan_path_override().unwrap_or_else(|| state_dir.join("plan.json"));
        Ok(Self {
            state_dir,
            state_path,
            plan_path,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
