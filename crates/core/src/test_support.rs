// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::check::{CheckConfig, CheckLevel, CheckName, CheckStartup, Probe};
use std::time::Duration;

/// A minimal, valid check config good for most tests: HTTP probe,
/// startup enabled, level unset.
pub fn fake_check_config(name: &str) -> CheckConfig {
    CheckConfig {
        name: CheckName::new(name),
        level: CheckLevel::Unset,
        startup: CheckStartup::Enabled,
        period: Duration::from_millis(10),
        timeout: Duration::from_millis(5),
        threshold: 3,
        probe: Probe::Http {
            url: format!("http://localhost/{name}"),
        },
    }
}

/// Same as [`fake_check_config`] but with an explicit period/timeout/threshold,
/// for tests that exercise timing or threshold behavior directly.
pub fn fake_check_config_with(name: &str, period: Duration, timeout: Duration, threshold: u32) -> CheckConfig {
    let mut cfg = fake_check_config(name);
    cfg.period = period;
    cfg.timeout = timeout;
    cfg.threshold = threshold;
    cfg
}
