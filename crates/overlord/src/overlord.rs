// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ensure loop: drives every registered [`Manager`] periodically,
//! coordinates startup/shutdown, and prunes stale changes.

use crate::manager::{Manager, ManagerError};
use pulse_core::Clock;
use pulse_runner::TaskRunner;
use pulse_state::{CheckpointError, Checkpointer, CheckpointWriter, FsCheckpointWriter, State};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const START_OF_OPERATION_KEY: &str = "start-of-operation-time";

#[derive(Debug, Error)]
pub enum OverlordError {
    #[error("manager start-up failed: {0}")]
    StartUp(#[from] ManagerError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("overlord did not converge within the settle cap")]
    NotConverging,
}

/// Tunable timing knobs. Production defaults are conservative; tests
/// construct their own short-interval [`Intervals`] to keep scenarios fast.
#[derive(Debug, Clone, Copy)]
pub struct Intervals {
    /// Upper bound between unrequested ensure cycles.
    pub ensure: Duration,
    /// How often the prune pass runs.
    pub prune_tick: Duration,
    /// A ready change is dropped once its ready time is older than this.
    pub prune_wait: Duration,
    /// A non-ready change is aborted once its spawn time is older than this.
    pub abort_wait: Duration,
    /// No change is aborted-by-age while `now <= start-of-operation-time +
    /// abort_grace` — protects against mass-abort right after a restart
    /// whose stored changes look ancient due to clock skew.
    pub abort_grace: Duration,
    /// Bounded wait for in-flight handlers to finish during shutdown.
    pub shutdown_grace: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            ensure: Duration::from_secs(5 * 60),
            prune_tick: Duration::from_secs(60 * 60),
            prune_wait: Duration::from_secs(24 * 60 * 60),
            abort_wait: Duration::from_secs(7 * 24 * 60 * 60),
            abort_grace: Duration::from_secs(10 * 60),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

pub struct Overlord<W: CheckpointWriter + Clone = FsCheckpointWriter> {
    state: Arc<State>,
    runner: Arc<TaskRunner>,
    clock: Arc<dyn Clock>,
    checkpointer: Checkpointer<W>,
    managers: Vec<Arc<dyn Manager>>,
    intervals: Intervals,
    cancel: CancellationToken,
    ran_one_cycle: AtomicBool,
}

impl<W: CheckpointWriter + Clone> Overlord<W> {
    pub fn new(
        state: Arc<State>,
        runner: Arc<TaskRunner>,
        clock: Arc<dyn Clock>,
        checkpointer: Checkpointer<W>,
        managers: Vec<Arc<dyn Manager>>,
        intervals: Intervals,
    ) -> Self {
        Self {
            state,
            runner,
            clock,
            checkpointer,
            managers,
            intervals,
            cancel: CancellationToken::new(),
            ran_one_cycle: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn runner(&self) -> &Arc<TaskRunner> {
        &self.runner
    }

    /// Runs each manager's `start_up` in registration order, then records
    /// `start-of-operation-time` if this is the first ever startup.
    pub fn start_up(&self) -> Result<(), OverlordError> {
        for manager in &self.managers {
            manager.start_up(&self.state)?;
        }
        let mut guard = self.state.lock();
        if guard.get::<u64>(START_OF_OPERATION_KEY).is_none() {
            let now = self.clock.now_epoch_ms();
            guard.set(START_OF_OPERATION_KEY, &now);
        }
        Ok(())
    }

    fn start_of_operation_ms(&self) -> u64 {
        self.state
            .lock()
            .get::<u64>(START_OF_OPERATION_KEY)
            .unwrap_or(0)
    }

    /// Calls `ensure` on every manager in order. Errors are logged, not
    /// propagated — one misbehaving manager must not stall the others.
    async fn ensure_managers(&self) {
        for manager in &self.managers {
            if let Err(err) = manager.ensure(&self.state).await {
                error!(?err, "manager ensure failed");
            }
        }
    }

    fn checkpoint_if_dirty(&self) {
        if !self.state.is_dirty() {
            return;
        }
        let doc = self.state.snapshot();
        match self.checkpointer.checkpoint_sync(&doc) {
            Ok(_) => self.state.clear_dirty(),
            Err(err) => warn!(?err, "checkpoint failed, will retry next cycle"),
        }
    }

    /// Drops ready changes past the retention window and aborts non-ready
    /// changes past the abort-age limit, except within the post-restart
    /// grace window.
    fn prune(&self) {
        let now = self.clock.now_epoch_ms();
        let start_of_op = self.start_of_operation_ms();
        let within_grace = now <= start_of_op.saturating_add(self.intervals.abort_grace.as_millis() as u64);

        let mut guard = self.state.lock();
        let change_ids: Vec<_> = guard.changes().map(|c| c.id.clone()).collect();
        for change_id in change_ids {
            let Some(change) = guard.change(&change_id).cloned() else {
                continue;
            };
            if let Some(ready_at) = change.ready_time_epoch_ms {
                let age = now.saturating_sub(ready_at);
                if age > self.intervals.prune_wait.as_millis() as u64 {
                    debug!(%change_id, "pruning ready change past retention window");
                    guard.remove_change(&change_id);
                    continue;
                }
            } else if !within_grace {
                let age = now.saturating_sub(change.spawn_time_epoch_ms);
                if age > self.intervals.abort_wait.as_millis() as u64 {
                    debug!(%change_id, "aborting change past abort-age limit");
                    let tasks = guard.tasks_for_change(&change_id);
                    let task_ids: Vec<_> = tasks
                        .iter()
                        .filter(|t| !t.status.is_terminal())
                        .map(|t| t.id.clone())
                        .collect();
                    for task_id in task_ids {
                        let _ = guard.abort_task(&task_id);
                    }
                    guard.refresh_change_status(&change_id, now);
                }
            }
        }
    }

    /// One full ensure cycle: drive every manager, prune, checkpoint.
    pub async fn ensure_once(&self) {
        self.ensure_managers().await;
        self.prune();
        self.checkpoint_if_dirty();
        self.ran_one_cycle.store(true, Ordering::SeqCst);
    }

    /// The long-running ensure loop. Returns once `request_shutdown` fires.
    pub async fn serve(&self) {
        let mut prune_ticker = tokio::time::interval(self.intervals.prune_tick);
        prune_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let deadline = self.next_ensure_deadline();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.ensure_once().await;
                }
                _ = prune_ticker.tick() => {
                    self.prune();
                    self.checkpoint_if_dirty();
                }
            }
        }
    }

    fn next_ensure_deadline(&self) -> Instant {
        let interval_deadline = Instant::now() + self.intervals.ensure;
        match self.state.take_ensure_before() {
            Some(requested) => {
                let requested = Instant::from_std(requested);
                interval_deadline.min(requested)
            }
            None => interval_deadline,
        }
    }

    pub fn request_shutdown(&self) {
        self.cancel.cancel();
    }

    /// Stop accepting new ensure cycles, cancel every in-flight handler,
    /// wait up to the shutdown grace window, then write a final checkpoint.
    pub async fn shutdown(&self) {
        self.request_shutdown();
        self.runner.shutdown(self.intervals.shutdown_grace).await;
        let doc = self.state.snapshot();
        if let Err(err) = self.checkpointer.checkpoint_sync(&doc) {
            warn!(?err, "final checkpoint failed during shutdown");
        } else {
            self.state.clear_dirty();
        }
    }

    /// True once the loop has completed at least one ensure cycle and no
    /// change is currently non-ready.
    pub fn can_standby(&self) -> bool {
        if !self.ran_one_cycle.load(Ordering::SeqCst) {
            return false;
        }
        let guard = self.state.lock();
        guard.changes().all(|change| {
            let tasks = guard.tasks_for_change(&change.id);
            pulse_core::Change::is_ready(&tasks) || tasks.is_empty()
        })
    }

    /// Test hook: drive ensure cycles until every change is ready or
    /// `timeout`/a bounded cycle cap is exceeded.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn settle(&self, timeout: Duration) -> Result<(), OverlordError> {
        const MAX_CYCLES: u32 = 10_000;
        let deadline = tokio::time::Instant::now() + timeout;
        let mut cycles = 0u32;
        loop {
            let all_ready = {
                let guard = self.state.lock();
                guard.changes().all(|change| {
                    let tasks = guard.tasks_for_change(&change.id);
                    tasks.is_empty() || pulse_core::Change::is_ready(&tasks)
                })
            };
            if all_ready {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline || cycles >= MAX_CYCLES {
                return Err(OverlordError::NotConverging);
            }
            self.ensure_once().await;
            tokio::task::yield_now().await;
            cycles += 1;
        }
    }
}

#[cfg(test)]
#[path = "overlord_tests.rs"]
mod tests;
