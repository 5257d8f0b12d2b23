// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin loader for the on-disk check plan.
//!
//! Parsing and persistence of a full plan/config document are out of scope
//! here — this only turns a JSON array of check configs on disk into
//! `Vec<CheckConfig>` so [`pulse_checkstate::CheckManager::plan`] has
//! something to install. A missing plan file is not an error: the daemon
//! starts with zero configured checks and waits to be reconfigured.

use pulse_core::CheckConfig;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanLoadError {
    #[error("I/O error reading plan {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed plan {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Load and validate the check plan at `path`. Returns an empty plan if the
/// file does not exist.
pub fn load_plan(path: &Path) -> Result<Vec<CheckConfig>, PlanLoadError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path).map_err(|source| PlanLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let configs: Vec<CheckConfig> = serde_json::from_slice(&bytes).map_err(|source| PlanLoadError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    for config in &configs {
        config.validate().map_err(PlanLoadError::Invalid)?;
    }
    Ok(configs)
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
