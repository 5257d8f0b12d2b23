// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapts [`pulse_checkstate::CheckManager`]'s in-scope counters (spec.md
//! §4.5 "Metrics accessors") into [`Metric`] samples. The HTTP endpoint that
//! would serve these is out of scope (spec.md §1); this only builds the
//! sample list an exporter would write.

use crate::metric::Metric;
use pulse_checkstate::CheckManager;

/// One counter pair per configured check, plus a gauge of how many checks
/// are currently `up`. Monotonic counters are never reset (spec.md §4.5).
pub fn collect_check_metrics(manager: &CheckManager) -> Vec<Metric> {
    let infos = manager.info(None);
    let mut metrics = Vec::with_capacity(infos.len() * 2 + 1);

    let up_count = infos
        .iter()
        .filter(|info| info.status == pulse_core::CheckStatus::Up)
        .count();
    metrics.push(
        Metric::gauge("pulse_checks_up", up_count as i64)
            .with_comment("Number of configured checks currently reporting up."),
    );

    for info in &infos {
        let (successes, failures) = manager.metrics(info.name.as_str()).unwrap_or((0, 0));
        metrics.push(
            Metric::counter("pulse_check_successes_total", successes as i64)
                .with_comment("Total successful evaluations of a health check.")
                .with_label("check", info.name.as_str()),
        );
        metrics.push(
            Metric::counter("pulse_check_failures_total", failures as i64)
                .with_comment("Total failed evaluations of a health check.")
                .with_label("check", info.name.as_str()),
        );
    }

    metrics
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
