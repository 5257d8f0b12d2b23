// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pulse-cli: the read-only `check` row formatter described in spec.md §6.
//! This crate has no socket client or network transport of its own — those
//! are the out-of-scope external front-end spec.md §1 names. What lives
//! here is only the formatting logic such a front-end would call once it
//! had fetched a [`format::CheckRow`] from the daemon.

mod format;

pub use format::{format_check_row, normalize_log_line, CheckRow, HEADER};
