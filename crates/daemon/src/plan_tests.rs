// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

#[test]
fn missing_plan_file_yields_empty_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.json");
    assert_eq!(load_plan(&path).unwrap(), Vec::new());
}

#[test]
fn loads_valid_plan_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"[{{"name":"web","level":"ready","startup":"enabled","period":{{"secs":5,"nanos":0}},"timeout":{{"secs":1,"nanos":0}},"threshold":3,"probe":{{"kind":"tcp","host":"localhost","port":8080}}}}]"#
    )
    .unwrap();

    let plan = load_plan(&path).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].name.as_str(), "web");
}

#[test]
fn rejects_plan_entry_failing_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"[{{"name":"web","level":"ready","startup":"enabled","period":{{"secs":0,"nanos":0}},"timeout":{{"secs":1,"nanos":0}},"threshold":3,"probe":{{"kind":"tcp","host":"localhost","port":8080}}}}]"#
    )
    .unwrap();

    assert!(matches!(load_plan(&path), Err(PlanLoadError::Invalid(_))));
}

#[test]
fn rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.json");
    std::fs::write(&path, b"not json").unwrap();
    assert!(matches!(load_plan(&path), Err(PlanLoadError::Parse { .. })));
}
