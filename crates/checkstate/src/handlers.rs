// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The perform-check and recover-check task handlers: the two halves of the
//! per-check state machine described by the manager's driving-task loop.
//!
//! Both handlers share the same scheduling shape (select over refresh /
//! ticker / cancellation) but differ in how they account failures: a
//! perform-check task terminates (moves to `Error`) once failures reach the
//! configured threshold, handing off to a freshly spawned recover-check
//! task; a recover-check task never terminates on failure and instead keeps
//! retrying until a single success lets it return to perform mode.

use crate::checker::{run_check, Checker};
use crate::record::CheckRecord;
use crate::records::CheckRecords;
use async_trait::async_trait;
use pulse_core::{CheckConfig, CheckDetails, CheckStatus};
use pulse_core::{ChangeId, TaskId};
use pulse_runner::{HandlerError, TaskHandler};
use pulse_state::State;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Durable task-attribute key the `CheckDetails` payload lives under.
pub const CHECK_DETAILS_ATTR: &str = "check-details";

pub fn perform_config_key(change_id: &ChangeId) -> String {
    format!("perform-config:{change_id}")
}

pub fn recover_config_key(change_id: &ChangeId) -> String {
    format!("recover-config:{change_id}")
}

/// Builds the concrete [`Checker`] for a check's configured probe.
/// Concrete HTTP/TCP/EXEC transports are out of scope; production wiring
/// supplies its own factory, tests use [`crate::checker::FakeChecker`]
/// behind a factory that always returns the same scripted instance.
pub trait CheckerFactory: Send + Sync {
    fn build(&self, config: &CheckConfig) -> Arc<dyn Checker>;
}

/// Invoked synchronously, from within the driving task, when a check's
/// failure count reaches its threshold. Must not block and must not
/// reacquire a lock the caller already holds.
pub type FailureHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct FailureHandlers {
    handlers: parking_lot::Mutex<Vec<(String, FailureHandler)>>,
}

impl FailureHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: impl Into<String>, handler: FailureHandler) {
        self.handlers.lock().push((name.into(), handler));
    }

    /// Invoke every registered handler for `check_name`, in registration
    /// order, serially. Handler panics are not caught — a handler that
    /// cannot run without blocking the driving task has a bug.
    fn call_all(&self, check_name: &str) {
        let handlers = self.handlers.lock();
        for (_, handler) in handlers.iter() {
            handler(check_name);
        }
    }
}

fn read_details(state: &Arc<State>, task_id: &TaskId) -> Option<CheckDetails> {
    state.lock().task(task_id).and_then(|t| t.get_attr(CHECK_DETAILS_ATTR))
}

fn write_details(state: &Arc<State>, task_id: &TaskId, details: &CheckDetails) {
    let mut guard = state.lock();
    if let Some(task) = guard.task_mut(task_id) {
        task.set_attr(CHECK_DETAILS_ATTR, details);
    }
}

/// Appends an error-level log line, matching the Go original's
/// `logTaskError` helper (`task.Errorf`).
fn log_task_error(state: &Arc<State>, task_id: &TaskId, message: &str) {
    let mut guard = state.lock();
    if let Some(task) = guard.task_mut(task_id) {
        task.errorf(message.to_string());
    }
}

/// Appends an info-level log line, matching the Go original's
/// `task.Logf` (used for the "succeeded after N failures" message).
fn log_task_info(state: &Arc<State>, task_id: &TaskId, message: &str) {
    let mut guard = state.lock();
    if let Some(task) = guard.task_mut(task_id) {
        task.logf(message.to_string());
    }
}

pub struct PerformCheckHandler {
    records: Arc<CheckRecords>,
    factory: Arc<dyn CheckerFactory>,
    failure_handlers: Arc<FailureHandlers>,
}

impl PerformCheckHandler {
    pub fn new(
        records: Arc<CheckRecords>,
        factory: Arc<dyn CheckerFactory>,
        failure_handlers: Arc<FailureHandlers>,
    ) -> Self {
        Self { records, factory, failure_handlers }
    }
}

#[async_trait]
impl TaskHandler for PerformCheckHandler {
    async fn do_task(
        &self,
        state: &Arc<State>,
        task_id: &TaskId,
        change_id: &ChangeId,
        cancel: CancellationToken,
    ) -> Result<(), HandlerError> {
        let mut details = read_details(state, task_id)
            .ok_or_else(|| HandlerError::Failed(format!("cannot get check details for perform-check task {task_id}")))?;
        let config: Arc<CheckConfig> = state
            .cached(&perform_config_key(change_id))
            .ok_or_else(|| HandlerError::Failed(format!("missing cached perform config for change {change_id}")))?;

        debug!(check = %details.name, period = ?config.period, "performing check");

        let record = self.records.ensure(Arc::clone(&config));
        record.set_change_id(Some(change_id.clone()));
        record.set_status(CheckStatus::Up);

        let checker = self.factory.build(&config);
        let mut ticker = tokio::time::interval(config.period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut refresh_rx = record.lock_refresh_receiver().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(HandlerError::Stopped);
                }
                received = refresh_rx.recv() => {
                    if received.is_none() {
                        return Err(HandlerError::Stopped);
                    }
                    ticker.reset();
                    let outcome = run_check(checker.as_ref(), cancel.clone(), config.timeout).await;
                    if cancel.is_cancelled() {
                        return Err(HandlerError::Stopped);
                    }
                    let terminal = account_perform_result(state, task_id, change_id, &config, &record, &self.failure_handlers, &mut details, &outcome);
                    let _ = record.result_sender().send(outcome.clone()).await;
                    if terminal {
                        return Err(HandlerError::Failed(outcome.err().map(|e| e.log_line()).unwrap_or_default()));
                    }
                }
                _ = ticker.tick() => {
                    let outcome = run_check(checker.as_ref(), cancel.clone(), config.timeout).await;
                    if cancel.is_cancelled() {
                        return Err(HandlerError::Stopped);
                    }
                    let terminal = account_perform_result(state, task_id, change_id, &config, &record, &self.failure_handlers, &mut details, &outcome);
                    if let Ok(()) = refresh_rx.try_recv() {
                        let _ = record.result_sender().send(outcome.clone()).await;
                    }
                    if terminal {
                        return Err(HandlerError::Failed(outcome.err().map(|e| e.log_line()).unwrap_or_default()));
                    }
                }
            }
        }
    }
}

/// Applies one perform-check evaluation outcome to in-memory and durable
/// state. Returns `true` if the threshold was reached this call (the
/// caller must terminate the driving task with an error).
fn account_perform_result(
    state: &Arc<State>,
    task_id: &TaskId,
    _change_id: &ChangeId,
    config: &CheckConfig,
    record: &Arc<CheckRecord>,
    failure_handlers: &Arc<FailureHandlers>,
    details: &mut CheckDetails,
    outcome: &Result<(), crate::checker::CheckError>,
) -> bool {
    match outcome {
        Err(err) => {
            record.record_failure();
            details.failures += 1;
            let at_threshold = details.at_threshold();
            if at_threshold {
                details.proceed = true;
            } else {
                record.set_failures(details.failures);
                log_task_error(state, task_id, &err.log_line());
            }
            write_details(state, task_id, details);
            info!(check = %details.name, failures = details.failures, threshold = details.threshold, "check failure");
            record.set_status(CheckStatus::Down);
            if at_threshold {
                info!(check = %details.name, threshold = config.threshold, "check threshold hit, triggering action and recovering");
                failure_handlers.call_all(details.name.as_str());
                true
            } else {
                false
            }
        }
        Ok(()) => {
            record.record_success();
            record.set_status(CheckStatus::Up);
            if details.failures > 0 {
                record.set_failures(0);
                let message = format!(
                    "succeeded after {}",
                    pulse_core::pluralise(details.failures, "failure", "failures")
                );
                details.failures = 0;
                write_details(state, task_id, details);
                log_task_info(state, task_id, &message);
            }
            false
        }
    }
}

pub struct RecoverCheckHandler {
    records: Arc<CheckRecords>,
    factory: Arc<dyn CheckerFactory>,
}

impl RecoverCheckHandler {
    pub fn new(records: Arc<CheckRecords>, factory: Arc<dyn CheckerFactory>) -> Self {
        Self { records, factory }
    }
}

#[async_trait]
impl TaskHandler for RecoverCheckHandler {
    async fn do_task(
        &self,
        state: &Arc<State>,
        task_id: &TaskId,
        change_id: &ChangeId,
        cancel: CancellationToken,
    ) -> Result<(), HandlerError> {
        let mut details = read_details(state, task_id)
            .ok_or_else(|| HandlerError::Failed(format!("cannot get check details for recover-check task {task_id}")))?;
        let config: Arc<CheckConfig> = state
            .cached(&recover_config_key(change_id))
            .ok_or_else(|| HandlerError::Failed(format!("missing cached recover config for change {change_id}")))?;

        debug!(check = %details.name, period = ?config.period, "recovering check");

        let record = self.records.ensure(Arc::clone(&config));
        record.set_change_id(Some(change_id.clone()));
        record.set_status(CheckStatus::Down);

        let checker = self.factory.build(&config);
        let mut ticker = tokio::time::interval(config.period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut refresh_rx = record.lock_refresh_receiver().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(HandlerError::Stopped);
                }
                received = refresh_rx.recv() => {
                    if received.is_none() {
                        return Err(HandlerError::Stopped);
                    }
                    ticker.reset();
                    let outcome = run_check(checker.as_ref(), cancel.clone(), config.timeout).await;
                    if cancel.is_cancelled() {
                        return Err(HandlerError::Stopped);
                    }
                    let recovered = account_recover_result(state, task_id, &record, &mut details, &outcome);
                    let _ = record.result_sender().send(outcome).await;
                    if recovered {
                        return Ok(());
                    }
                }
                _ = ticker.tick() => {
                    let outcome = run_check(checker.as_ref(), cancel.clone(), config.timeout).await;
                    if cancel.is_cancelled() {
                        return Err(HandlerError::Stopped);
                    }
                    let recovered = account_recover_result(state, task_id, &record, &mut details, &outcome);
                    if let Ok(()) = refresh_rx.try_recv() {
                        let _ = record.result_sender().send(outcome.clone()).await;
                    }
                    if recovered {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Applies one recover-check evaluation outcome. Returns `true` once the
/// probe has succeeded once, signalling the caller to return `Ok(())` and
/// let the overlord swap back to a perform-check task.
fn account_recover_result(
    state: &Arc<State>,
    task_id: &TaskId,
    record: &Arc<CheckRecord>,
    details: &mut CheckDetails,
    outcome: &Result<(), crate::checker::CheckError>,
) -> bool {
    match outcome {
        Err(err) => {
            record.record_failure();
            details.failures += 1;
            record.set_failures(details.failures);
            write_details(state, task_id, details);
            log_task_error(state, task_id, &err.log_line());
            info!(check = %details.name, failures = details.failures, "recover-check failure");
            false
        }
        Ok(()) => {
            record.record_success();
            details.failures = 0;
            details.proceed = true;
            write_details(state, task_id, details);
            record.set_failures(0);
            record.set_status(CheckStatus::Up);
            true
        }
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
