// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `check` row formatter, grounded in
//! `examples/original_source/internals/cli/cmd_check.go`. This crate has no
//! network client of its own (spec.md §1 names that as an out-of-scope
//! collaborator) — it only formats the DTO such a client would have already
//! fetched.

use pulse_core::{CheckLevel, CheckStartup, CheckStatus};

/// Byte cap on the trailing `(last-log)` annotation, matching the Pebble
/// original's `maxError` constant.
const MAX_ERROR_BYTES: usize = 70;

/// The header row `check` prints above every result, tab-separated to match
/// spec.md §6 exactly (not the padded/colorized table the rest of a larger
/// CLI might use for list views).
pub const HEADER: &str = "Check\tLevel\tStartup\tStatus\tFailures\tChange";

/// Everything the row formatter needs about one check. A real front-end
/// would fetch this from the daemon's (out-of-scope) query surface.
#[derive(Debug, Clone)]
pub struct CheckRow {
    pub name: String,
    pub level: CheckLevel,
    pub startup: CheckStartup,
    pub status: CheckStatus,
    pub failures: u32,
    pub threshold: u32,
    pub change_id: Option<String>,
}

/// Renders one tab-separated data row. `last_task_log`, when given, is the
/// most recent log line of the change's first task — already normalised by
/// [`normalize_log_line`] — and is only ever shown when `failures > 0`.
pub fn format_check_row(row: &CheckRow, last_task_log: Option<&str>) -> String {
    let level = row.level.to_string();
    let failures = if row.status == CheckStatus::Inactive {
        "-".to_string()
    } else {
        format!("{}/{}", row.failures, row.threshold)
    };
    let change = format_change_cell(row, last_task_log);

    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        row.name, level, row.startup, row.status, failures, change
    )
}

fn format_change_cell(row: &CheckRow, last_task_log: Option<&str>) -> String {
    let Some(change_id) = row.change_id.as_deref() else {
        return "-".to_string();
    };
    if row.failures == 0 {
        return change_id.to_string();
    }
    match last_task_log {
        Some(log) if !log.is_empty() => {
            format!("{change_id} ({})", truncate_log(log, change_id))
        }
        _ => change_id.to_string(),
    }
}

/// Truncates `log` to [`MAX_ERROR_BYTES`], appending the "run ... for more"
/// suffix in its place when truncation occurs (byte lengths, matching the
/// Go original's `len`/slice semantics; truncation snaps back to the
/// nearest char boundary so multi-byte UTF-8 never splits).
fn truncate_log(log: &str, change_id: &str) -> String {
    if log.len() <= MAX_ERROR_BYTES {
        return log.to_string();
    }
    let for_more = format!("... run \"pulse tasks {change_id}\" for more");
    let keep = MAX_ERROR_BYTES.saturating_sub(for_more.len());
    let mut boundary = keep.min(log.len());
    while boundary > 0 && !log.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}{}", &log[..boundary], for_more)
}

/// Strips a leading `<timestamp> LEVEL ` prefix from a raw task log line and
/// replaces embedded newlines with the literal two-character sequence
/// `\n`, matching `cmdCheck.lastTaskLog` in the Pebble original.
pub fn normalize_log_line(raw: &str) -> String {
    let stripped = {
        let mut fields = raw.splitn(3, ' ');
        let first = fields.next();
        let second = fields.next();
        let rest = fields.next();
        match (first, second, rest) {
            (Some(_), Some(_), Some(rest)) => rest,
            _ => raw,
        }
    };
    stripped.replace('\n', "\\n")
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
