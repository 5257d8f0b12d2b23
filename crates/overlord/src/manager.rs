// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Manager` trait every subsystem the ensure loop drives implements.

use async_trait::async_trait;
use pulse_state::State;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    Failed(String),
}

impl ManagerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A subsystem the overlord drives: one `start_up` call at boot, then one
/// `ensure` call per loop cycle, in registration order.
///
/// `start_up` defaults to a no-op; most managers only need `ensure`.
#[async_trait]
pub trait Manager: Send + Sync {
    fn start_up(&self, _state: &Arc<State>) -> Result<(), ManagerError> {
        Ok(())
    }

    async fn ensure(&self, state: &Arc<State>) -> Result<(), ManagerError>;
}
