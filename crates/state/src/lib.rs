// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pulse-state: the lock-protected, checkpointed state container.

pub mod checkpoint;
pub mod patch;
mod state;

pub use checkpoint::{
    load_state_document, CheckpointError, CheckpointHandle, CheckpointResult, Checkpointer,
    CheckpointWriter, FsCheckpointWriter, CURRENT_PATCH_VERSION,
};
pub use patch::{Patch, PatchError, PatchRegistry, PatchVersion};
pub use state::{State, StateDocument, StateGuard};
