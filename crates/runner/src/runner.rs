// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives registered handlers for `Do`/`Doing` tasks, one Tokio task per
//! running task id, each under its own [`CancellationToken`].

use crate::{HandlerError, HandlerRegistry, TaskHandler};
use parking_lot::Mutex;
use pulse_core::{ChangeId, Clock, TaskId, TaskStatus};
use pulse_state::State;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct TaskRunner {
    state: Arc<State>,
    registry: HandlerRegistry,
    clock: Arc<dyn Clock>,
    cancels: Mutex<HashMap<TaskId, CancellationToken>>,
    joins: Mutex<JoinSet<()>>,
}

impl TaskRunner {
    pub fn new(state: Arc<State>, registry: HandlerRegistry, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            state,
            registry,
            clock,
            cancels: Mutex::new(HashMap::new()),
            joins: Mutex::new(JoinSet::new()),
        })
    }

    /// True if a Tokio task is currently driving `task_id`.
    pub fn is_running(&self, task_id: &TaskId) -> bool {
        self.cancels.lock().contains_key(task_id)
    }

    /// Spawn execution of `task_id` if it isn't already running. No-op for
    /// an unknown task id or one already being driven.
    pub fn spawn(self: &Arc<Self>, task_id: TaskId) {
        {
            let mut cancels = self.cancels.lock();
            if cancels.contains_key(&task_id) {
                return;
            }
            cancels.insert(task_id.clone(), CancellationToken::new());
        }

        let this = Arc::clone(self);
        let tid = task_id.clone();
        self.joins.lock().spawn(async move {
            this.run_one(tid).await;
        });
    }

    /// Request cancellation of a running task. The handler observes this
    /// through the token passed to `do_task`; it is responsible for
    /// returning [`HandlerError::Stopped`] promptly.
    pub fn cancel(&self, task_id: &TaskId) {
        if let Some(token) = self.cancels.lock().get(task_id) {
            token.cancel();
        }
    }

    /// Cancel every running task and wait up to `grace` for them to finish.
    /// Tasks still running after the grace window are abandoned; their
    /// Tokio tasks keep running detached until the process exits.
    pub async fn shutdown(&self, grace: Duration) {
        for token in self.cancels.lock().values() {
            token.cancel();
        }

        let mut joins = std::mem::take(&mut *self.joins.lock());
        let drain = async {
            while joins.join_next().await.is_some() {}
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!(?grace, "task runner shutdown grace period elapsed with handlers still running");
        }
    }

    async fn run_one(&self, task_id: TaskId) {
        let Some((kind, change_id)) = ({
            let guard = self.state.lock();
            guard.task(&task_id).map(|t| (t.kind.clone(), t.change_id.clone()))
        }) else {
            self.cancels.lock().remove(&task_id);
            return;
        };

        let handler = self.registry.get(&kind);
        let cancel = self
            .cancels
            .lock()
            .get(&task_id)
            .cloned()
            .unwrap_or_default();

        {
            let mut guard = self.state.lock();
            if let Some(task) = guard.task_mut(&task_id) {
                let _ = task.set_status(TaskStatus::Doing);
            }
        }

        let result = match handler {
            Some(handler) => handler.do_task(&self.state, &task_id, &change_id, cancel).await,
            None => Err(HandlerError::Failed(format!(
                "no handler registered for task kind {kind:?}"
            ))),
        };

        self.finish(&task_id, &change_id, result);
    }

    fn finish(&self, task_id: &TaskId, change_id: &ChangeId, result: Result<(), HandlerError>) {
        let mut retry_after = None;
        {
            let mut guard = self.state.lock();
            match result {
                Ok(()) => {
                    if let Some(task) = guard.task_mut(task_id) {
                        let _ = task.set_status(TaskStatus::Done);
                    }
                }
                Err(HandlerError::Retry(delay)) => {
                    if let Some(task) = guard.task_mut(task_id) {
                        let _ = task.set_status(TaskStatus::Do);
                    }
                    retry_after = Some(delay);
                }
                Err(HandlerError::Stopped) => {
                    if let Some(task) = guard.task_mut(task_id) {
                        let _ = task.set_status(TaskStatus::Hold);
                    }
                }
                Err(HandlerError::Failed(message)) => {
                    if let Some(task) = guard.task_mut(task_id) {
                        task.errorf(message);
                        let _ = task.set_status(TaskStatus::Error);
                    }
                }
            }
            let now = self.clock.now_epoch_ms();
            guard.refresh_change_status(change_id, now);
        }

        if let Some(delay) = retry_after {
            self.state.ensure_before(delay);
        }
        self.cancels.lock().remove(task_id);
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
