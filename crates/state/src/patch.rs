// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Patch chain for schema evolution of the persisted state document.
//!
//! A patch transforms the document JSON from one `(level, sublevel)` pair to
//! the next. The registry chains patches in order until the binary's
//! compiled-in target pair is reached, checkpointing after each step.

use serde_json::Value;
use thiserror::Error;

pub type PatchVersion = (u32, u32);

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch {from:?}->{to:?} failed: {reason}")]
    Failed {
        from: PatchVersion,
        to: PatchVersion,
        reason: String,
    },
    #[error("no patch path from {0:?} to {1:?}")]
    NoPath(PatchVersion, PatchVersion),
    #[error("state file patch level {0:?} is newer than supported {1:?}")]
    TooNew(PatchVersion, PatchVersion),
}

/// A single upgrade step in the patch chain.
pub trait Patch: Send + Sync {
    fn source(&self) -> PatchVersion;
    fn target(&self) -> PatchVersion;
    fn apply(&self, doc: &mut Value) -> Result<(), PatchError>;
}

/// Registry of patches, chained by matching `source()` to the current
/// version until `target` is reached.
#[derive(Default)]
pub struct PatchRegistry {
    patches: Vec<Box<dyn Patch>>,
}

impl PatchRegistry {
    pub fn new() -> Self {
        Self {
            patches: Vec::new(),
        }
    }

    pub fn register(&mut self, patch: Box<dyn Patch>) {
        self.patches.push(patch);
    }

    /// Current `(patch-level, patch-sublevel)` read from the document,
    /// defaulting to `(1, 0)` for a freshly created document.
    fn current_version(doc: &Value) -> PatchVersion {
        let level = doc
            .get("patch-level")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as u32;
        let sublevel = doc
            .get("patch-sublevel")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        (level, sublevel)
    }

    /// Walk the patch chain until the document reaches `target`, stamping
    /// `patch-level`/`patch-sublevel` after each step.
    pub fn migrate_to(&self, mut doc: Value, target: PatchVersion) -> Result<Value, PatchError> {
        let mut current = Self::current_version(&doc);

        if current == target {
            return Ok(doc);
        }
        if current > target {
            return Err(PatchError::TooNew(current, target));
        }

        while current != target {
            let patch = self
                .patches
                .iter()
                .find(|p| p.source() == current)
                .ok_or(PatchError::NoPath(current, target))?;

            patch.apply(&mut doc)?;
            current = patch.target();

            if let Some(obj) = doc.as_object_mut() {
                obj.insert("patch-level".into(), current.0.into());
                obj.insert("patch-sublevel".into(), current.1.into());
            }
        }
        Ok(doc)
    }
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod tests;
