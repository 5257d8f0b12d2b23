// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::test_support::fake_check_config;

#[test]
fn ensure_creates_once_and_reuses_thereafter() {
    let records = CheckRecords::new();
    let config = Arc::new(fake_check_config("web"));
    let first = records.ensure(Arc::clone(&config));
    let second = records.ensure(Arc::clone(&config));
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn remove_drops_the_record_and_get_then_returns_none() {
    let records = CheckRecords::new();
    let config = Arc::new(fake_check_config("web"));
    records.ensure(config);
    assert!(records.get("web").is_some());
    records.remove("web");
    assert!(records.get("web").is_none());
}

#[test]
fn names_and_snapshot_reflect_every_ensured_check() {
    let records = CheckRecords::new();
    records.ensure(Arc::new(fake_check_config("a")));
    records.ensure(Arc::new(fake_check_config("b")));
    let mut names: Vec<_> = records.names().iter().map(|n| n.as_str().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(records.snapshot().len(), 2);
}
