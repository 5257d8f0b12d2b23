// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenMetrics text exposition, grounded in
//! `examples/original_source/internals/metrics/metrics.go`: one `# HELP`
//! line (if a comment is set), one `# TYPE` line, then the sample itself on
//! its own line. See spec.md §6 for the exact field ordering this preserves.

use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed writing metric: {0}")]
    Io(#[from] io::Error),
}

/// The two metric shapes spec.md §6 names. Pebble's original enum also lists
/// a gauge variant; the check manager only ever emits counters, but the
/// writer supports both so other managers can reuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        };
        write!(f, "{s}")
    }
}

/// A single `name="value"` label attached to a metric sample.
#[derive(Debug, Clone)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One metric sample: name, type, integer value, optional `# HELP` comment,
/// and zero or more labels.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: String,
    pub metric_type: MetricType,
    pub value: i64,
    pub comment: String,
    pub labels: Vec<Label>,
}

impl Metric {
    pub fn counter(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Counter,
            value,
            comment: String::new(),
            labels: Vec::new(),
        }
    }

    pub fn gauge(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Gauge,
            value,
            comment: String::new(),
            labels: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push(Label::new(key, value));
        self
    }
}

/// Writes [`Metric`]s in OpenMetrics text exposition format.
pub trait MetricWriter {
    fn write(&mut self, metric: &Metric) -> Result<(), MetricsError>;
}

/// Writes to any `io::Write`, one metric at a time.
pub struct OpenMetricsWriter<W: Write> {
    out: W,
}

impl<W: Write> OpenMetricsWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MetricWriter for OpenMetricsWriter<W> {
    fn write(&mut self, metric: &Metric) -> Result<(), MetricsError> {
        if !metric.comment.is_empty() {
            writeln!(self.out, "# HELP {} {}", metric.name, metric.comment)?;
        }
        writeln!(self.out, "# TYPE {} {}", metric.name, metric.metric_type)?;

        let labels = format_labels(&metric.labels);
        writeln!(self.out, "{}{} {}", metric.name, labels, metric.value)?;
        Ok(())
    }
}

/// `{k="v",...}`, or empty string when there are no labels — braces are
/// omitted entirely rather than rendered empty (spec.md §6).
fn format_labels(labels: &[Label]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = labels
        .iter()
        .map(|l| format!("{}=\"{}\"", l.key, escape(&l.value)))
        .collect();
    format!("{{{}}}", parts.join(","))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
#[path = "metric_tests.rs"]
mod tests;
