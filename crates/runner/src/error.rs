// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use thiserror::Error;

/// Outcome a [`crate::TaskHandler`] reports back to the runner. The runner,
/// not the handler, owns the task status transition that follows.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Ask the runner to requeue the task (`Doing -> Do`) and request the
    /// ensure loop run again no later than the given delay.
    #[error("retry requested after {0:?}")]
    Retry(Duration),

    /// The handler observed its cancellation token and stopped early. This
    /// is never treated as a probe failure; the task moves to `Hold`.
    #[error("task stopped on cancellation")]
    Stopped,

    /// A terminal failure. The task moves to `Error` and the message is
    /// appended to its log.
    #[error("{0}")]
    Failed(String),
}
