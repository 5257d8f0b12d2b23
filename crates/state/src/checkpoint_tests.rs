// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::patch::PatchRegistry;
use tempfile::tempdir;

#[test]
fn checkpoint_then_load_roundtrips_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let checkpointer = Checkpointer::new(path.clone());

    let mut doc = StateDocument::empty();
    doc.data.insert("mark".into(), serde_json::json!(1));

    let handle = checkpointer.start(&doc);
    let result = handle.wait().unwrap();
    assert!(result.size_bytes > 0);

    let registry = PatchRegistry::new();
    let loaded = load_state_document(&path, &registry).unwrap();
    assert_eq!(loaded.data.get("mark"), Some(&serde_json::json!(1)));
}

#[test]
fn missing_file_loads_as_empty_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist.json");
    let registry = PatchRegistry::new();
    let loaded = load_state_document(&path, &registry).unwrap();
    assert!(loaded.data.is_empty());
    assert!(loaded.changes.is_empty());
}

#[test]
fn malformed_file_is_a_fatal_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"not json").unwrap();
    let registry = PatchRegistry::new();
    assert!(load_state_document(&path, &registry).is_err());
}

#[cfg(unix)]
#[test]
fn checkpoint_writes_file_mode_0600() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let checkpointer = Checkpointer::new(path.clone());
    checkpointer.checkpoint_sync(&StateDocument::empty()).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn sync_checkpoint_is_immediately_observable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let checkpointer = Checkpointer::new(path.clone());
    checkpointer.checkpoint_sync(&StateDocument::empty()).unwrap();
    assert!(path.exists());
}
