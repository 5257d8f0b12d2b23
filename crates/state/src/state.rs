// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The global state container: a lock-protected, JSON-serialisable tree of
//! changes, tasks, and free-form key/value data.
//!
//! There is exactly one lock here (`stateLock` in the design notes); nothing
//! is layered below it. Structural mutation is only reachable through the
//! [`StateGuard`] returned by [`State::lock`], so "mutation without the lock
//! held" cannot compile against this API at all — a stricter reading of the
//! spec's "enforced via assert-held in debug builds" note, made static
//! instead of a runtime assertion.

use parking_lot::{Mutex, MutexGuard};
use pulse_core::{Change, ChangeId, ChangeStatus, CounterIdGen, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The persisted shape of the state file: `data`, `changes`, `tasks`, and the
/// monotonic id counters, exactly matching the documented top-level keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub data: HashMap<String, Value>,
    #[serde(default)]
    pub changes: HashMap<ChangeId, Change>,
    #[serde(default)]
    pub tasks: HashMap<TaskId, Task>,
    #[serde(rename = "last-change-id", default)]
    pub last_change_id: u64,
    #[serde(rename = "last-task-id", default)]
    pub last_task_id: u64,
    #[serde(rename = "last-lane-id", default)]
    pub last_lane_id: u64,
    #[serde(rename = "last-notice-id", default)]
    pub last_notice_id: u64,
    #[serde(rename = "patch-level", default = "default_patch_level")]
    pub patch_level: u32,
    #[serde(rename = "patch-sublevel", default)]
    pub patch_sublevel: u32,
}

fn default_patch_level() -> u32 {
    1
}

impl StateDocument {
    pub fn empty() -> Self {
        Self {
            patch_level: default_patch_level(),
            ..Default::default()
        }
    }
}

/// Thread-safe, checkpoint-backed holder of a [`StateDocument`], plus the
/// non-persisted `Cached` side table and the `EnsureBefore` deadline.
pub struct State {
    doc: Mutex<StateDocument>,
    dirty: AtomicBool,
    cached: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    ensure_before: Mutex<Option<Instant>>,
    change_id_gen: CounterIdGen,
    task_id_gen: CounterIdGen,
}

impl State {
    pub fn new(doc: StateDocument) -> Self {
        let change_id_gen = CounterIdGen::resume_after(doc.last_change_id);
        let task_id_gen = CounterIdGen::resume_after(doc.last_task_id);
        Self {
            doc: Mutex::new(doc),
            dirty: AtomicBool::new(false),
            cached: Mutex::new(HashMap::new()),
            ensure_before: Mutex::new(None),
            change_id_gen,
            task_id_gen,
        }
    }

    pub fn empty() -> Self {
        Self::new(StateDocument::empty())
    }

    /// Acquire the single global lock. Every structural read or mutation
    /// must go through the returned guard.
    pub fn lock(&self) -> StateGuard<'_> {
        StateGuard {
            doc: self.doc.lock(),
            dirty: &self.dirty,
            change_id_gen: &self.change_id_gen,
            task_id_gen: &self.task_id_gen,
        }
    }

    /// Debug-only assertion that the caller already holds the lock — useful
    /// at call sites that receive a `&State` but expect a guard to already
    /// be live on the current thread.
    pub fn debug_assert_held(&self) {
        debug_assert!(self.doc.is_locked(), "state lock must be held here");
    }

    /// True if a mutation has occurred since the last successful checkpoint.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    /// Snapshot the document for checkpointing. Callers should hold the lock
    /// only long enough to clone; serialisation happens off-lock.
    pub fn snapshot(&self) -> StateDocument {
        self.doc.lock().clone()
    }

    /// Request that the ensure loop run no later than `now + d`. Tightens
    /// monotonically: a later call with a larger delay never pushes the
    /// deadline back out.
    pub fn ensure_before(&self, d: Duration) {
        let deadline = Instant::now() + d;
        let mut slot = self.ensure_before.lock();
        match *slot {
            Some(existing) if existing <= deadline => {}
            _ => *slot = Some(deadline),
        }
    }

    /// Take the current `EnsureBefore` deadline, clearing it.
    pub fn take_ensure_before(&self) -> Option<Instant> {
        self.ensure_before.lock().take()
    }

    /// Non-persisted cache, keyed by caller-chosen string (e.g.
    /// `"perform-config:{change-id}"`). Guarded by its own lock so readers
    /// never need the structural state lock.
    pub fn cached<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.cached
            .lock()
            .get(key)
            .and_then(|v| v.clone().downcast::<T>().ok())
    }

    pub fn set_cached<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.cached.lock().insert(key.into(), Arc::new(value));
    }

    pub fn drop_cached(&self, key: &str) {
        self.cached.lock().remove(key);
    }
}

/// RAII handle to the locked state document. All structural operations the
/// spec assigns to the state container live here.
pub struct StateGuard<'a> {
    doc: MutexGuard<'a, StateDocument>,
    dirty: &'a AtomicBool,
    change_id_gen: &'a CounterIdGen,
    task_id_gen: &'a CounterIdGen,
}

impl StateGuard<'_> {
    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Typed read from the root `data` map.
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.doc
            .data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Typed write into the root `data` map.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.doc.data.insert(key.to_string(), v);
            self.mark_dirty();
        }
    }

    /// Create a new change and return its id. The change starts empty; add
    /// tasks with [`StateGuard::new_task`].
    pub fn new_change(&mut self, kind: impl Into<String>, summary: impl Into<String>, now_epoch_ms: u64) -> ChangeId {
        let id = ChangeId::new(self.change_id_gen.next());
        self.doc.last_change_id = self.change_id_gen.current();
        let change = Change::new(id.clone(), kind, summary, now_epoch_ms);
        self.doc.changes.insert(id.clone(), change);
        self.mark_dirty();
        id
    }

    /// Create a new task belonging to `change_id`, appending its id to the
    /// change's `task_ids`.
    pub fn new_task(&mut self, change_id: &ChangeId, kind: impl Into<String>, summary: impl Into<String>) -> TaskId {
        let id = TaskId::new(self.task_id_gen.next());
        self.doc.last_task_id = self.task_id_gen.current();
        let task = Task::new(id.clone(), change_id.clone(), kind, summary);
        self.doc.tasks.insert(id.clone(), task);
        if let Some(change) = self.doc.changes.get_mut(change_id) {
            change.task_ids.push(id.clone());
        }
        self.mark_dirty();
        id
    }

    pub fn change(&self, id: &ChangeId) -> Option<&Change> {
        self.doc.changes.get(id)
    }

    pub fn change_mut(&mut self, id: &ChangeId) -> Option<&mut Change> {
        self.mark_dirty();
        self.doc.changes.get_mut(id)
    }

    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.doc.changes.values()
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.doc.tasks.get(id)
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.mark_dirty();
        self.doc.tasks.get_mut(id)
    }

    pub fn tasks_for_change(&self, change_id: &ChangeId) -> Vec<&Task> {
        match self.doc.changes.get(change_id) {
            Some(change) => change
                .task_ids
                .iter()
                .filter_map(|id| self.doc.tasks.get(id))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Recompute the change's aggregate status and set its ready time once,
    /// the first time every member task becomes terminal.
    pub fn refresh_change_status(&mut self, change_id: &ChangeId, now_epoch_ms: u64) -> Option<ChangeStatus> {
        let tasks = self.tasks_for_change(change_id);
        let status = Change::aggregate_status(&tasks);
        let ready = Change::is_ready(&tasks);
        self.mark_dirty();
        if let Some(change) = self.doc.changes.get_mut(change_id) {
            if ready && change.ready_time_epoch_ms.is_none() {
                change.ready_time_epoch_ms = Some(now_epoch_ms);
            }
        }
        Some(status)
    }

    pub fn remove_change(&mut self, id: &ChangeId) {
        if let Some(change) = self.doc.changes.remove(id) {
            for task_id in &change.task_ids {
                self.doc.tasks.remove(task_id);
            }
            self.mark_dirty();
        }
    }

    pub fn abort_task(&mut self, id: &TaskId) -> Result<(), String> {
        self.mark_dirty();
        match self.doc.tasks.get_mut(id) {
            Some(task) if task.status == TaskStatus::Doing => task.set_status(TaskStatus::Abort),
            Some(task) if !task.status.is_terminal() => task.set_status(TaskStatus::Hold),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
