// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory check record table (`checksLock`-protected) and its
//! single-slot refresh/result rendezvous channels.
//!
//! A record is created on first reference and retained across the
//! perform/recover mode swap; it is destroyed only when the check is
//! removed from the plan. Its channels therefore outlive any one driving
//! task — a task swap never sends into a channel nobody reads from, since
//! the record (not the task) owns both ends.

use parking_lot::Mutex as SyncMutex;
use pulse_core::{CheckConfig, CheckName, CheckStatus, ChangeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::checker::CheckError;

#[derive(Debug, Clone)]
pub struct CheckRecordState {
    pub status: CheckStatus,
    pub failures: u32,
    pub change_id: Option<ChangeId>,
}

/// A single check's mutable in-memory bookkeeping, plus the rendezvous
/// channels `RunCheck` and the driving task use to hand off on-demand
/// evaluations.
pub struct CheckRecord {
    pub name: CheckName,
    config: SyncMutex<Arc<CheckConfig>>,
    state: SyncMutex<CheckRecordState>,
    successes_total: AtomicU64,
    failures_total: AtomicU64,
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: AsyncMutex<mpsc::Receiver<()>>,
    result_tx: mpsc::Sender<Result<(), CheckError>>,
    result_rx: AsyncMutex<mpsc::Receiver<Result<(), CheckError>>>,
}

impl CheckRecord {
    pub fn new(config: Arc<CheckConfig>) -> Arc<Self> {
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (result_tx, result_rx) = mpsc::channel(1);
        Arc::new(Self {
            name: config.name.clone(),
            config: SyncMutex::new(config),
            state: SyncMutex::new(CheckRecordState {
                status: CheckStatus::Inactive,
                failures: 0,
                change_id: None,
            }),
            successes_total: AtomicU64::new(0),
            failures_total: AtomicU64::new(0),
            refresh_tx,
            refresh_rx: AsyncMutex::new(refresh_rx),
            result_tx,
            result_rx: AsyncMutex::new(result_rx),
        })
    }

    pub fn config(&self) -> Arc<CheckConfig> {
        self.config.lock().clone()
    }

    pub fn set_config(&self, config: Arc<CheckConfig>) {
        *self.config.lock() = config;
    }

    pub fn state(&self) -> CheckRecordState {
        self.state.lock().clone()
    }

    pub fn set_status(&self, status: CheckStatus) {
        self.state.lock().status = status;
    }

    pub fn set_change_id(&self, change_id: Option<ChangeId>) {
        self.state.lock().change_id = change_id;
    }

    pub fn set_failures(&self, failures: u32) {
        self.state.lock().failures = failures;
    }

    pub fn failures(&self) -> u32 {
        self.state.lock().failures
    }

    pub fn record_success(&self) {
        self.successes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn success_count(&self) -> u64 {
        self.successes_total.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures_total.load(Ordering::Relaxed)
    }

    /// Hand a sender clone to a would-be `RunCheck` caller.
    pub fn refresh_sender(&self) -> mpsc::Sender<()> {
        self.refresh_tx.clone()
    }

    /// Hand a sender clone to the currently driving task.
    pub fn result_sender(&self) -> mpsc::Sender<Result<(), CheckError>> {
        self.result_tx.clone()
    }

    /// Locked for the lifetime of one driving task's select loop — the
    /// consumer side of `refresh`. Only one task may drive a check at a
    /// time, so this never contends.
    pub async fn lock_refresh_receiver(&self) -> tokio::sync::MutexGuard<'_, mpsc::Receiver<()>> {
        self.refresh_rx.lock().await
    }

    /// Locked across the full send-then-receive round trip of a single
    /// `RunCheck` call, which is what makes a second concurrent call
    /// serialise behind the first rather than observe a stale result.
    pub async fn lock_result_receiver(&self) -> tokio::sync::MutexGuard<'_, mpsc::Receiver<Result<(), CheckError>>> {
        self.result_rx.lock().await
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
