// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `checksLock`-protected in-memory table of [`CheckRecord`]s.
//!
//! This lock is outermost: it must never be held while acquiring the state
//! container's lock. Every method here takes and releases its guard before
//! returning, so callers never carry it across a `state.lock()` call.

use parking_lot::Mutex;
use pulse_core::{CheckConfig, CheckName};
use std::collections::HashMap;
use std::sync::Arc;

use crate::record::CheckRecord;

#[derive(Default)]
pub struct CheckRecords {
    checks: Mutex<HashMap<CheckName, Arc<CheckRecord>>>,
}

impl CheckRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for `name`, creating it from `config` if this is the
    /// first reference. Mirrors the upstream `ensureCheck`.
    pub fn ensure(&self, config: Arc<CheckConfig>) -> Arc<CheckRecord> {
        let mut checks = self.checks.lock();
        checks
            .entry(config.name.clone())
            .or_insert_with(|| CheckRecord::new(Arc::clone(&config)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CheckRecord>> {
        self.checks.lock().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<CheckRecord>> {
        self.checks.lock().remove(name)
    }

    pub fn names(&self) -> Vec<CheckName> {
        self.checks.lock().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<Arc<CheckRecord>> {
        self.checks.lock().values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
