// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Checker` capability and the timeout-wrapping `run_check` helper.
//!
//! Concrete HTTP/TCP/EXEC probes are external collaborators (out of scope
//! here, per the probe transports exclusion); only the trait, the timeout
//! wrapper, and a closure-backed fake used in tests live in this module.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error returned by a probe attempt.
///
/// `details`, when present, is appended to task logs alongside the message
/// (mirrors the upstream `detailsError` interface).
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct CheckError {
    pub message: String,
    pub details: Option<String>,
}

impl CheckError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Stable marker produced when a probe's per-attempt deadline fires.
    pub fn timed_out(timeout: Duration) -> Self {
        Self::new(format!("check timed out after {timeout:?}"))
    }

    /// Message plus details, joined the way the task log wants it.
    pub fn log_line(&self) -> String {
        match &self.details {
            Some(details) if !details.is_empty() => format!("{}; {}", self.message, details),
            _ => self.message.clone(),
        }
    }
}

/// A probe capability: runs once and reports success or failure.
///
/// Implementations must respect cancellation of `cancel` promptly — a
/// blocking I/O call with no native cancellation support must be wrapped in
/// a thread whose result is funnelled through a cancellable channel.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, cancel: CancellationToken) -> Result<(), CheckError>;
}

/// Runs `chk` under a per-attempt deadline of `timeout`. On expiry, the
/// returned error carries the stable "check timed out after <timeout>"
/// marker text; any other error flows through verbatim.
pub async fn run_check(chk: &dyn Checker, cancel: CancellationToken, timeout: Duration) -> Result<(), CheckError> {
    match tokio::time::timeout(timeout, chk.check(cancel)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(CheckError::timed_out(timeout)),
    }
}

/// Closure-backed checker for tests: each call advances to the next
/// scripted outcome, repeating the final one once the script is exhausted.
pub struct FakeChecker {
    outcomes: parking_lot::Mutex<Vec<FakeOutcome>>,
    calls: Arc<std::sync::atomic::AtomicUsize>,
}

#[derive(Clone)]
pub enum FakeOutcome {
    Ok,
    Err(CheckError),
    /// Sleeps for the given duration before resolving `Ok` — used to drive
    /// the per-attempt timeout path.
    Delay(Duration),
}

impl FakeChecker {
    pub fn new(outcomes: Vec<FakeOutcome>) -> Self {
        Self {
            outcomes: parking_lot::Mutex::new(outcomes),
            calls: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(vec![FakeOutcome::Ok])
    }

    pub fn always_err(message: impl Into<String>) -> Self {
        Self::new(vec![FakeOutcome::Err(CheckError::new(message))])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn next_outcome(&self) -> FakeOutcome {
        let mut outcomes = self.outcomes.lock();
        if outcomes.len() > 1 {
            outcomes.remove(0)
        } else {
            outcomes
                .first()
                .cloned()
                .unwrap_or(FakeOutcome::Ok)
        }
    }
}

#[async_trait]
impl Checker for FakeChecker {
    async fn check(&self, cancel: CancellationToken) -> Result<(), CheckError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match self.next_outcome() {
            FakeOutcome::Ok => Ok(()),
            FakeOutcome::Err(err) => Err(err),
            FakeOutcome::Delay(d) => {
                tokio::select! {
                    _ = tokio::time::sleep(d) => Ok(()),
                    _ = cancel.cancelled() => Err(CheckError::new("cancelled")),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "checker_tests.rs"]
mod tests;
