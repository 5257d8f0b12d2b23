// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background checkpointing of the state document with durable fsync.
//!
//! ## Design
//!
//! ```text
//! Main Thread                    Background Thread
//! ───────────────────────────    ─────────────────────────────
//! clone document (~ms)
//!   │
//!   └─────────────────────────→  serialize (JSON)
//!                                write to .tmp
//!                                fsync .tmp
//!                                rename → state.json
//!                                fsync directory
//!                                chmod 0600
//!                                  │
//!   ←────────────────────────────┘ (completion signal)
//! ```
//!
//! ## Testability
//!
//! The `CheckpointWriter` trait abstracts all I/O operations, enabling
//! deterministic unit tests and error-injection for crash scenarios.

use crate::patch::PatchRegistry;
use crate::StateDocument;
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

pub const CURRENT_PATCH_VERSION: (u32, u32) = (1, 0);

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("checkpoint failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Patch(#[from] crate::patch::PatchError),
}

#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub size_bytes: u64,
}

/// Trait abstracting checkpoint I/O for testability.
pub trait CheckpointWriter: Send + Sync + 'static {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError>;
    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError>;
    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError>;
    fn set_mode_0600(&self, path: &Path) -> Result<(), CheckpointError>;
    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError>;
}

/// Production checkpoint writer using real filesystem operations.
#[derive(Clone)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        let file = File::open(path)?;
        file.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        let dir = File::open(path)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(unix)]
    fn set_mode_0600(&self, path: &Path) -> Result<(), CheckpointError> {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn set_mode_0600(&self, _path: &Path) -> Result<(), CheckpointError> {
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError> {
        Ok(std::fs::metadata(path)?.len())
    }
}

/// Handle to a running checkpoint operation.
pub struct CheckpointHandle {
    receiver: mpsc::Receiver<Result<CheckpointResult, CheckpointError>>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl CheckpointHandle {
    /// Wait for the checkpoint to complete.
    pub fn wait(self) -> Result<CheckpointResult, CheckpointError> {
        self.receiver
            .recv()
            .map_err(|_| CheckpointError::Failed("checkpoint thread panicked".into()))?
    }

    /// Check if checkpoint is complete without blocking.
    pub fn try_wait(&self) -> Option<Result<CheckpointResult, CheckpointError>> {
        self.receiver.try_recv().ok()
    }
}

/// Checkpointer manages background state-document writes.
pub struct Checkpointer<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    state_path: PathBuf,
}

impl Checkpointer<FsCheckpointWriter> {
    pub fn new(state_path: PathBuf) -> Self {
        Self::with_writer(FsCheckpointWriter, state_path)
    }
}

impl<W: CheckpointWriter + Clone> Checkpointer<W> {
    pub fn with_writer(writer: W, state_path: PathBuf) -> Self {
        Self { writer, state_path }
    }

    /// Start a background checkpoint. The caller must already hold the state
    /// lock while cloning `doc` so the write reflects a consistent snapshot.
    pub fn start(&self, doc: &StateDocument) -> CheckpointHandle {
        let doc_clone = doc.clone();
        let writer = self.writer.clone();
        let state_path = self.state_path.clone();

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let result = checkpoint_blocking(&writer, &doc_clone, &state_path);
            if let Err(ref err) = result {
                warn!(?err, "checkpoint failed, will retry next ensure cycle");
            }
            let _ = tx.send(result);
        });

        CheckpointHandle { receiver: rx, handle }
    }

    /// Perform a synchronous checkpoint (used at shutdown, where waiting for
    /// a background thread buys nothing).
    pub fn checkpoint_sync(&self, doc: &StateDocument) -> Result<CheckpointResult, CheckpointError> {
        checkpoint_blocking(&self.writer, doc, &self.state_path)
    }
}

fn checkpoint_blocking<W: CheckpointWriter>(
    writer: &W,
    doc: &StateDocument,
    state_path: &Path,
) -> Result<CheckpointResult, CheckpointError> {
    let tmp_path = state_path.with_extension("tmp");

    let json_bytes = serde_json::to_vec(doc)?;
    writer.write_tmp(&tmp_path, &json_bytes)?;
    writer.fsync_file(&tmp_path)?;
    writer.set_mode_0600(&tmp_path)?;
    writer.rename(&tmp_path, state_path)?;
    if let Some(parent) = state_path.parent() {
        writer.fsync_dir(parent)?;
    }

    let size_bytes = writer
        .file_size(state_path)
        .unwrap_or(json_bytes.len() as u64);

    debug!(size_bytes, path = %state_path.display(), "state checkpoint written");
    Ok(CheckpointResult { size_bytes })
}

/// Load the state document from disk, running it through the patch chain up
/// to [`CURRENT_PATCH_VERSION`]. A missing file is treated as empty state; a
/// malformed file is a fatal startup error.
pub fn load_state_document(path: &Path, patches: &PatchRegistry) -> Result<StateDocument, CheckpointError> {
    if !path.exists() {
        return Ok(StateDocument::empty());
    }

    let file = File::open(path)?;
    let value: Value = serde_json::from_reader(file)?;
    let migrated = patches.migrate_to(value, CURRENT_PATCH_VERSION)?;
    let doc: StateDocument = serde_json::from_value(migrated)?;
    Ok(doc)
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
