// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_task_starts_in_do_status() {
    let task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "Run check \"web\"");
    assert_eq!(task.status, TaskStatus::Do);
}

#[yare::parameterized(
    do_to_doing    = { TaskStatus::Do, TaskStatus::Doing, true },
    doing_to_done  = { TaskStatus::Doing, TaskStatus::Done, true },
    doing_to_error = { TaskStatus::Doing, TaskStatus::Error, true },
    done_to_doing  = { TaskStatus::Done, TaskStatus::Doing, false },
    error_to_do    = { TaskStatus::Error, TaskStatus::Do, false },
    hold_to_doing  = { TaskStatus::Hold, TaskStatus::Doing, false },
)]
fn transition_legality(from: TaskStatus, to: TaskStatus, expected: bool) {
    assert_eq!(from.can_transition_to(to), expected);
}

#[test]
fn set_status_rejects_illegal_transition() {
    let mut task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "x");
    task.set_status(TaskStatus::Done).unwrap_err();
    assert_eq!(task.status, TaskStatus::Do);
}

#[test]
fn set_status_is_idempotent_for_same_status() {
    let mut task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "x");
    task.set_status(TaskStatus::Do).unwrap();
    assert_eq!(task.status, TaskStatus::Do);
}

#[test]
fn terminal_statuses() {
    assert!(TaskStatus::Done.is_terminal());
    assert!(TaskStatus::Error.is_terminal());
    assert!(TaskStatus::Hold.is_terminal());
    assert!(!TaskStatus::Doing.is_terminal());
    assert!(!TaskStatus::Do.is_terminal());
}

#[test]
fn attribute_roundtrip() {
    use crate::check::{CheckDetails, CheckName};

    let mut task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "x");
    let details = CheckDetails::new(CheckName::new("web"), 3);
    task.set_attr("check-details", &details);
    let roundtripped: CheckDetails = task.get_attr("check-details").unwrap();
    assert_eq!(roundtripped, details);
}

#[test]
fn missing_attribute_is_none() {
    let task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "x");
    assert!(task.get_attr::<u32>("nope").is_none());
}

#[test]
fn logf_prepends_timestamp_and_info_level() {
    let mut task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "x");
    task.logf("succeeded after 3 failures");
    let mut fields = task.log[0].splitn(3, ' ');
    let timestamp = fields.next().unwrap();
    let level = fields.next().unwrap();
    let message = fields.next().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(), "got {timestamp:?}");
    assert_eq!(level, "INFO");
    assert_eq!(message, "succeeded after 3 failures");
}

#[test]
fn errorf_prepends_timestamp_and_error_level() {
    let mut task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "x");
    task.errorf("connection refused on port 80");
    let mut fields = task.log[0].splitn(3, ' ');
    let timestamp = fields.next().unwrap();
    let level = fields.next().unwrap();
    let message = fields.next().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(), "got {timestamp:?}");
    assert_eq!(level, "ERROR");
    assert_eq!(message, "connection refused on port 80");
}

fn task_with_status(status: TaskStatus) -> Task {
    let mut task = Task::new(TaskId::new("1"), ChangeId::new("1"), "perform-check", "x");
    task.status = status;
    task
}

#[test]
fn change_aggregate_status_error_wins() {
    let a = task_with_status(TaskStatus::Done);
    let b = task_with_status(TaskStatus::Error);
    assert_eq!(Change::aggregate_status(&[&a, &b]), ChangeStatus::Error);
}

#[test]
fn change_aggregate_status_doing_while_in_progress() {
    let a = task_with_status(TaskStatus::Done);
    let b = task_with_status(TaskStatus::Doing);
    assert_eq!(Change::aggregate_status(&[&a, &b]), ChangeStatus::Doing);
}

#[test]
fn change_aggregate_status_done_only_when_all_done() {
    let a = task_with_status(TaskStatus::Done);
    let b = task_with_status(TaskStatus::Done);
    assert_eq!(Change::aggregate_status(&[&a, &b]), ChangeStatus::Done);
}

#[test]
fn change_is_ready_requires_all_terminal() {
    let a = task_with_status(TaskStatus::Done);
    let b = task_with_status(TaskStatus::Doing);
    assert!(!Change::is_ready(&[&a, &b]));
    let c = task_with_status(TaskStatus::Error);
    assert!(Change::is_ready(&[&a, &c]));
}

#[test]
fn change_is_ready_false_for_empty_change() {
    assert!(!Change::is_ready(&[]));
}
