// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task/Change durable work model.
//!
//! Tasks and changes reference each other only by id (never by pointer) so
//! that both can live in the state container's flat maps and serialise
//! without cycles — see the "cyclic back-reference" design note.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

crate::define_id! {
    /// Identifier of a task, a decimal string drawn from `last-task-id`.
    pub struct TaskId;
}

crate::define_id! {
    /// Identifier of a change, a decimal string drawn from `last-change-id`.
    pub struct ChangeId;
}

/// A task's position in its fixed status DAG.
///
/// Transitions are: `Do -> Doing -> {Done, Error, Hold}`, `Doing -> Abort`
/// mid-flight on cancellation, and `Wait` for tasks blocked on `WaitFor`
/// edges not yet satisfied. `Done`, `Error`, and `Hold` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Do,
    Doing,
    Done,
    Abort,
    Error,
    Hold,
    Wait,
}

impl TaskStatus {
    /// Terminal statuses never transition again; this is the condition a
    /// change's readiness check relies on.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error | TaskStatus::Hold)
    }

    /// Whether `self -> next` is a legal edge in the task status DAG.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Do, Doing)
                | (Do, Wait)
                | (Do, Hold)
                | (Wait, Do)
                | (Wait, Hold)
                | (Doing, Done)
                | (Doing, Error)
                | (Doing, Abort)
                | (Doing, Hold)
                | (Abort, Error)
                | (Abort, Hold)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Do => "Do",
            TaskStatus::Doing => "Doing",
            TaskStatus::Done => "Done",
            TaskStatus::Abort => "Abort",
            TaskStatus::Error => "Error",
            TaskStatus::Hold => "Hold",
            TaskStatus::Wait => "Wait",
        };
        write!(f, "{s}")
    }
}

/// A durable unit of work, dispatched to a registered handler by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub change_id: ChangeId,
    pub kind: String,
    pub summary: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub log: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub wait_for: Vec<TaskId>,
}

impl Task {
    pub fn new(id: TaskId, change_id: ChangeId, kind: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id,
            change_id,
            kind: kind.into(),
            summary: summary.into(),
            status: TaskStatus::Do,
            log: Vec::new(),
            attributes: HashMap::new(),
            wait_for: Vec::new(),
        }
    }

    /// Attempt a status transition, enforcing the fixed DAG invariant.
    /// Returns `Err` describing the illegal edge rather than panicking —
    /// handler bugs should surface as task errors, not process aborts.
    pub fn set_status(&mut self, next: TaskStatus) -> Result<(), String> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "illegal task transition {} -> {} for task {}",
                self.status, next, self.id
            ));
        }
        self.status = next;
        Ok(())
    }

    /// Append an info-level log line, prefixed with `<timestamp> INFO `
    /// (matching the Go original's `task.Logf`) — the prefix the CLI
    /// formatter's [`normalize_log_line`](https://docs.rs/pulse-cli) strips
    /// back off.
    pub fn logf(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.log.push(format!("{}{line}", crate::time_fmt::log_prefix("INFO")));
    }

    /// Append an error-level log line, prefixed with `<timestamp> ERROR `
    /// (matching the Go original's `task.Errorf`).
    pub fn errorf(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.log.push(format!("{}{line}", crate::time_fmt::log_prefix("ERROR")));
    }

    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_attr<T: Serialize>(&mut self, key: &str, value: &T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.attributes.insert(key.to_string(), v);
        }
    }
}

/// Aggregated status of a change, derived from member task statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeStatus {
    Do,
    Doing,
    Done,
    Abort,
    Error,
    Hold,
    Wait,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeStatus::Do => "Do",
            ChangeStatus::Doing => "Doing",
            ChangeStatus::Done => "Done",
            ChangeStatus::Abort => "Abort",
            ChangeStatus::Error => "Error",
            ChangeStatus::Hold => "Hold",
            ChangeStatus::Wait => "Wait",
        };
        write!(f, "{s}")
    }
}

/// A grouping of tasks representing one user-visible operation (e.g. "run
/// perform-check for check X").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    pub kind: String,
    pub summary: String,
    pub task_ids: Vec<TaskId>,
    pub spawn_time_epoch_ms: u64,
    pub ready_time_epoch_ms: Option<u64>,
}

impl Change {
    pub fn new(id: ChangeId, kind: impl Into<String>, summary: impl Into<String>, spawn_time_epoch_ms: u64) -> Self {
        Self {
            id,
            kind: kind.into(),
            summary: summary.into(),
            task_ids: Vec::new(),
            spawn_time_epoch_ms,
            ready_time_epoch_ms: None,
        }
    }

    /// Aggregate status over the given tasks (must be exactly this change's
    /// member tasks, in any order). Precedence mirrors the upstream
    /// aggregation: any `Error` wins, then `Abort`, then any non-terminal
    /// status in progress, then `Hold`, and only `Done` when every task is
    /// `Done`.
    pub fn aggregate_status(tasks: &[&Task]) -> ChangeStatus {
        if tasks.is_empty() {
            return ChangeStatus::Done;
        }
        if tasks.iter().any(|t| t.status == TaskStatus::Error) {
            return ChangeStatus::Error;
        }
        if tasks.iter().any(|t| t.status == TaskStatus::Abort) {
            return ChangeStatus::Abort;
        }
        if tasks.iter().any(|t| t.status == TaskStatus::Doing) {
            return ChangeStatus::Doing;
        }
        if tasks.iter().any(|t| t.status == TaskStatus::Wait) {
            return ChangeStatus::Wait;
        }
        if tasks.iter().all(|t| t.status == TaskStatus::Done) {
            return ChangeStatus::Done;
        }
        if tasks.iter().any(|t| t.status == TaskStatus::Hold) {
            return ChangeStatus::Hold;
        }
        ChangeStatus::Do
    }

    /// A change is ready once every member task is terminal. The ready time
    /// is set exactly once, by the caller, when this first becomes true.
    pub fn is_ready(tasks: &[&Task]) -> bool {
        !tasks.is_empty() && tasks.iter().all(|t| t.status.is_terminal())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
