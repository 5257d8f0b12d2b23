// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The check manager: installs check plans, spawns/cancels driving tasks,
//! and exposes the read-only `Info`/`RunCheck` surface described in
//! spec.md §4.5. Observes terminal driving-task states during `ensure()`
//! and spawns the successor task — this is the single place that enforces
//! "at most one of {perform, recover} is `Doing` at any instant", since a
//! replacement task is only ever spawned once its predecessor has reached
//! a terminal status.
//!
//! Construction is two-phase via [`CheckManagerBuilder`]: the handler
//! registry the [`pulse_runner::TaskRunner`] needs must exist before the
//! runner does, but the manager itself needs the runner to spawn tasks —
//! the builder holds the shared `records`/`factory`/`failure_handlers`
//! pieces the handlers close over, then threads the same `Arc`s into the
//! finished [`CheckManager`] once its runner is available.

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use pulse_core::{Clock, CheckConfig, CheckDetails, CheckName, CheckStatus, CheckStartup, ChangeId, TaskId, TaskStatus};
use pulse_overlord::{Manager, ManagerError};
use pulse_runner::{HandlerRegistry, TaskRunner};
use pulse_state::State;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::checker::CheckError;
use crate::handlers::{
    perform_config_key, recover_config_key, CheckerFactory, FailureHandler, FailureHandlers,
    PerformCheckHandler, RecoverCheckHandler, CHECK_DETAILS_ATTR,
};
use crate::records::CheckRecords;

pub const PERFORM_CHECK_KIND: &str = "perform-check";
pub const RECOVER_CHECK_KIND: &str = "recover-check";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrivingKind {
    Perform,
    Recover,
}

#[derive(Clone)]
struct ActiveDriver {
    change_id: ChangeId,
    task_id: TaskId,
    kind: DrivingKind,
}

/// Added/removed/changed sets produced by comparing two plan snapshots.
/// Pure and independent of locking/spawning so it is unit-testable alone.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlanDiff {
    pub added: Vec<CheckName>,
    pub removed: Vec<CheckName>,
    pub changed: Vec<CheckName>,
    pub unchanged: Vec<CheckName>,
}

pub fn diff_plan(previous: &HashMap<CheckName, Arc<CheckConfig>>, next: &[CheckConfig]) -> PlanDiff {
    let mut diff = PlanDiff::default();
    let next_names: HashSet<&CheckName> = next.iter().map(|c| &c.name).collect();

    for name in previous.keys() {
        if !next_names.contains(name) {
            diff.removed.push(name.clone());
        }
    }
    for config in next {
        match previous.get(&config.name) {
            None => diff.added.push(config.name.clone()),
            Some(old) if old.as_ref() != config => diff.changed.push(config.name.clone()),
            Some(_) => diff.unchanged.push(config.name.clone()),
        }
    }
    diff
}

/// Read-only snapshot of one check, per spec.md §4.5 `Info`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckInfo {
    pub name: CheckName,
    pub level: pulse_core::CheckLevel,
    pub startup: CheckStartup,
    pub status: CheckStatus,
    pub failures: u32,
    pub threshold: u32,
    pub change_id: Option<ChangeId>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunCheckError {
    #[error("run-check cancelled")]
    Cancelled,
    #[error(transparent)]
    Probe(#[from] CheckError),
    #[error("refresh channels not initialized for check {0:?}")]
    NotInitialized(String),
}

struct ManagerInner {
    configs: HashMap<CheckName, Arc<CheckConfig>>,
    active: HashMap<CheckName, ActiveDriver>,
    pending_respawn: HashSet<CheckName>,
}

/// Shared pieces the perform/recover handlers close over, assembled before
/// the task runner exists. `handler_registry()` builds the registry the
/// runner is constructed with; `finish()` then produces the [`CheckManager`]
/// that drives that same runner.
pub struct CheckManagerBuilder {
    records: Arc<CheckRecords>,
    factory: Arc<dyn CheckerFactory>,
    failure_handlers: Arc<FailureHandlers>,
}

impl CheckManagerBuilder {
    pub fn new(factory: Arc<dyn CheckerFactory>) -> Self {
        Self {
            records: Arc::new(CheckRecords::new()),
            factory,
            failure_handlers: Arc::new(FailureHandlers::new()),
        }
    }

    pub fn add_failure_handler(&self, name: impl Into<String>, handler: FailureHandler) {
        self.failure_handlers.add(name, handler);
    }

    pub fn handler_registry(&self) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(
            PERFORM_CHECK_KIND,
            Arc::new(PerformCheckHandler::new(
                Arc::clone(&self.records),
                Arc::clone(&self.factory),
                Arc::clone(&self.failure_handlers),
            )),
        );
        registry.register(
            RECOVER_CHECK_KIND,
            Arc::new(RecoverCheckHandler::new(Arc::clone(&self.records), Arc::clone(&self.factory))),
        );
        registry
    }

    pub fn finish(self, runner: Arc<TaskRunner>, clock: Arc<dyn Clock>) -> Arc<CheckManager> {
        Arc::new(CheckManager {
            inner: SyncMutex::new(ManagerInner {
                configs: HashMap::new(),
                active: HashMap::new(),
                pending_respawn: HashSet::new(),
            }),
            records: self.records,
            failure_handlers: self.failure_handlers,
            runner,
            clock,
        })
    }
}

/// `checksLock` is `inner`; it is always acquired before any `state.lock()`
/// call inside a method here, and released (the guard dropped) before the
/// next `state.lock()` in the same loop iteration — never the reverse.
pub struct CheckManager {
    inner: SyncMutex<ManagerInner>,
    records: Arc<CheckRecords>,
    failure_handlers: Arc<FailureHandlers>,
    runner: Arc<TaskRunner>,
    clock: Arc<dyn Clock>,
}

impl CheckManager {
    /// Registers an additional failure handler, called synchronously from
    /// within the driving task whenever any check's failure count reaches
    /// its threshold.
    pub fn add_failure_handler(&self, name: impl Into<String>, handler: FailureHandler) {
        self.failure_handlers.add(name, handler);
    }

    /// Installs/updates the set of configured checks. See spec.md §4.5
    /// `Plan`: added checks get new records and perform-check tasks;
    /// removed checks cancel their driving change and delete the record;
    /// changed checks cancel and re-spawn.
    pub fn plan(&self, state: &Arc<State>, configs: Vec<CheckConfig>) {
        let mut inner = self.inner.lock();
        let diff = diff_plan(&inner.configs, &configs);
        let new_configs: HashMap<CheckName, Arc<CheckConfig>> =
            configs.into_iter().map(|c| (c.name.clone(), Arc::new(c))).collect();

        for name in &diff.removed {
            if let Some(driver) = inner.active.remove(name) {
                self.runner.cancel(&driver.task_id);
                let mut guard = state.lock();
                guard.remove_change(&driver.change_id);
            }
            inner.pending_respawn.remove(name);
            self.records.remove(name.as_str());
            debug!(check = %name, "removed check from plan");
        }

        for name in &diff.changed {
            if let Some(driver) = inner.active.get(name).cloned() {
                self.runner.cancel(&driver.task_id);
                inner.pending_respawn.insert(name.clone());
            } else if let Some(config) = new_configs.get(name) {
                if config.startup == CheckStartup::Enabled {
                    self.spawn_perform(state, &mut inner, Arc::clone(config));
                }
            }
            if let Some(record) = self.records.get(name.as_str()) {
                if let Some(config) = new_configs.get(name) {
                    record.set_config(Arc::clone(config));
                }
            }
            debug!(check = %name, "check configuration changed");
        }

        for name in &diff.added {
            if let Some(config) = new_configs.get(name) {
                if config.startup == CheckStartup::Enabled {
                    self.spawn_perform(state, &mut inner, Arc::clone(config));
                }
            }
        }

        inner.configs = new_configs;
    }

    fn spawn_perform(&self, state: &Arc<State>, inner: &mut ManagerInner, config: Arc<CheckConfig>) {
        let now = self.clock.now_epoch_ms();
        let (change_id, task_id) = {
            let mut guard = state.lock();
            let change_id = guard.new_change(PERFORM_CHECK_KIND, format!("Perform check {:?}", config.name.as_str()), now);
            let task_id = guard.new_task(&change_id, PERFORM_CHECK_KIND, format!("Perform check {:?}", config.name.as_str()));
            if let Some(task) = guard.task_mut(&task_id) {
                task.set_attr(CHECK_DETAILS_ATTR, &CheckDetails::new(config.name.clone(), config.threshold));
            }
            (change_id, task_id)
        };
        state.set_cached(perform_config_key(&change_id), (*config).clone());

        let record = self.records.ensure(Arc::clone(&config));
        record.set_change_id(Some(change_id.clone()));
        record.set_failures(0);

        inner.active.insert(
            config.name.clone(),
            ActiveDriver { change_id, task_id: task_id.clone(), kind: DrivingKind::Perform },
        );
        self.runner.spawn(task_id);
    }

    /// Spawns a recover-check task carrying fresh `CheckDetails` (§4.5: the
    /// overlord spawns the recover task "carrying fresh CheckDetails" — the
    /// failure count the perform task terminated with, which already equals
    /// `threshold`, is not carried over).
    fn spawn_recover(&self, state: &Arc<State>, inner: &mut ManagerInner, config: Arc<CheckConfig>) {
        let now = self.clock.now_epoch_ms();
        let (change_id, task_id) = {
            let mut guard = state.lock();
            let change_id = guard.new_change(RECOVER_CHECK_KIND, format!("Recover check {:?}", config.name.as_str()), now);
            let task_id = guard.new_task(&change_id, RECOVER_CHECK_KIND, format!("Recover check {:?}", config.name.as_str()));
            if let Some(task) = guard.task_mut(&task_id) {
                task.set_attr(CHECK_DETAILS_ATTR, &CheckDetails::new(config.name.clone(), config.threshold));
            }
            (change_id, task_id)
        };
        state.set_cached(recover_config_key(&change_id), (*config).clone());

        let record = self.records.ensure(Arc::clone(&config));
        record.set_change_id(Some(change_id.clone()));

        inner.active.insert(
            config.name.clone(),
            ActiveDriver { change_id, task_id: task_id.clone(), kind: DrivingKind::Recover },
        );
        self.runner.spawn(task_id);
    }

    /// Read-only snapshot over every configured check, or just `filter` if given.
    pub fn info(&self, filter: Option<&str>) -> Vec<CheckInfo> {
        let inner = self.inner.lock();
        let mut out = Vec::new();
        for (name, config) in inner.configs.iter() {
            if let Some(f) = filter {
                if name.as_str() != f {
                    continue;
                }
            }
            let (status, failures) = if config.startup == CheckStartup::Disabled {
                (CheckStatus::Inactive, 0)
            } else {
                match self.records.get(name.as_str()) {
                    Some(record) => {
                        let st = record.state();
                        (st.status, st.failures)
                    }
                    None => (CheckStatus::Inactive, 0),
                }
            };
            out.push(CheckInfo {
                name: name.clone(),
                level: config.level,
                startup: config.startup,
                status,
                failures,
                threshold: config.threshold,
                change_id: inner.active.get(name).map(|a| a.change_id.clone()),
            });
        }
        out.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        out
    }

    /// Monotonic per-check success/failure counters; `None` if the check
    /// has never run.
    pub fn metrics(&self, name: &str) -> Option<(u64, u64)> {
        self.records.get(name).map(|r| (r.success_count(), r.failure_count()))
    }

    /// On-demand forced evaluation. See spec.md §4.5 `RunCheck`.
    pub async fn run_check(&self, name: &str, cancel: CancellationToken) -> Result<(), RunCheckError> {
        let config = {
            let inner = self.inner.lock();
            inner.configs.get(name).cloned()
        };
        let Some(config) = config else {
            return Err(RunCheckError::NotInitialized(name.to_string()));
        };
        let record = self.records.ensure(config);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunCheckError::Cancelled),
            send_result = record.refresh_sender().send(()) => {
                if send_result.is_err() {
                    return Err(RunCheckError::NotInitialized(name.to_string()));
                }
            }
        }

        let mut result_rx = record.lock_result_receiver().await;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunCheckError::Cancelled),
            received = result_rx.recv() => {
                match received {
                    Some(Ok(())) => Ok(()),
                    Some(Err(err)) => Err(RunCheckError::Probe(err)),
                    None => Err(RunCheckError::NotInitialized(name.to_string())),
                }
            }
        }
    }
}

#[async_trait]
impl Manager for CheckManager {
    fn start_up(&self, _state: &Arc<State>) -> Result<(), ManagerError> {
        let inner = self.inner.lock();
        for (name, config) in inner.configs.iter() {
            if !inner.active.contains_key(name) && config.startup == CheckStartup::Enabled {
                debug!(check = %name, "starting check on reboot");
            }
        }
        Ok(())
    }

    async fn ensure(&self, state: &Arc<State>) -> Result<(), ManagerError> {
        let mut inner = self.inner.lock();
        let names: Vec<CheckName> = inner.active.keys().cloned().collect();
        for name in names {
            let Some(driver) = inner.active.get(&name).cloned() else {
                continue;
            };
            let status = {
                let guard = state.lock();
                guard.task(&driver.task_id).map(|t| t.status)
            };
            let Some(status) = status else {
                inner.active.remove(&name);
                continue;
            };
            if !status.is_terminal() {
                continue;
            }

            match (driver.kind, status) {
                (DrivingKind::Perform, TaskStatus::Error) => {
                    if let Some(config) = inner.configs.get(&name).cloned() {
                        self.spawn_recover(state, &mut inner, config);
                    } else {
                        inner.active.remove(&name);
                    }
                }
                (DrivingKind::Recover, TaskStatus::Done) => {
                    if let Some(config) = inner.configs.get(&name).cloned() {
                        self.spawn_perform(state, &mut inner, config);
                    } else {
                        inner.active.remove(&name);
                    }
                }
                (_, TaskStatus::Hold) => {
                    if inner.pending_respawn.remove(&name) {
                        match inner.configs.get(&name).cloned() {
                            Some(config) if config.startup == CheckStartup::Enabled => {
                                self.spawn_perform(state, &mut inner, config);
                            }
                            _ => {
                                inner.active.remove(&name);
                            }
                        }
                    } else {
                        inner.active.remove(&name);
                    }
                }
                _ => {
                    inner.active.remove(&name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
