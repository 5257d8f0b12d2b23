// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::HandlerError;
use async_trait::async_trait;
use pulse_core::{ChangeId, TaskId};
use pulse_state::State;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A handler dispatched by task `kind`. Handlers own their own retry/timeout
/// semantics; the runner only interprets the final [`HandlerError`] variant
/// to decide the task's next status.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn do_task(
        &self,
        state: &Arc<State>,
        task_id: &TaskId,
        change_id: &ChangeId,
        cancel: CancellationToken,
    ) -> Result<(), HandlerError>;
}

/// Maps task `kind` strings to their handler. Registration happens once at
/// startup; lookups are read-only afterwards.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(kind).cloned()
    }
}
