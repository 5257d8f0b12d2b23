// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's concrete [`CheckerFactory`].
//!
//! Concrete HTTP/TCP/EXEC probe transports are external collaborators this
//! scheduler does not own (spec.md §1's probe-transport exclusion) — this
//! factory reports a clear "not implemented" failure for every probe kind
//! rather than guessing at a transport. An embedding system that wants real
//! probing supplies its own [`CheckerFactory`] to [`pulse_checkstate::CheckManagerBuilder::new`]
//! in place of this one.

use async_trait::async_trait;
use pulse_checkstate::{CheckError, Checker, CheckerFactory};
use pulse_core::{CheckConfig, Probe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct UnimplementedChecker {
    kind: &'static str,
}

#[async_trait]
impl Checker for UnimplementedChecker {
    async fn check(&self, _cancel: CancellationToken) -> Result<(), CheckError> {
        Err(CheckError::new(format!("{} probes are not implemented by this daemon", self.kind)))
    }
}

pub struct DefaultCheckerFactory;

impl CheckerFactory for DefaultCheckerFactory {
    fn build(&self, config: &CheckConfig) -> Arc<dyn Checker> {
        let kind = match &config.probe {
            Probe::Http { .. } => "http",
            Probe::Tcp { .. } => "tcp",
            Probe::Exec { .. } => "exec",
        };
        Arc::new(UnimplementedChecker { kind })
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
