// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

struct AddMarkPatch;

impl Patch for AddMarkPatch {
    fn source(&self) -> PatchVersion {
        (1, 0)
    }

    fn target(&self) -> PatchVersion {
        (1, 1)
    }

    fn apply(&self, doc: &mut Value) -> Result<(), PatchError> {
        if let Some(obj) = doc.as_object_mut() {
            obj.entry("data").or_insert_with(|| json!({}));
            obj["data"]["migrated"] = json!(true);
        }
        Ok(())
    }
}

#[test]
fn no_op_when_already_at_target() {
    let registry = PatchRegistry::new();
    let doc = json!({"patch-level": 1, "patch-sublevel": 1});
    let result = registry.migrate_to(doc.clone(), (1, 1)).unwrap();
    assert_eq!(result, doc);
}

#[test]
fn applies_single_patch_in_chain() {
    let mut registry = PatchRegistry::new();
    registry.register(Box::new(AddMarkPatch));
    let doc = json!({"patch-level": 1, "patch-sublevel": 0, "data": {}});
    let result = registry.migrate_to(doc, (1, 1)).unwrap();
    assert_eq!(result["patch-level"], 1);
    assert_eq!(result["patch-sublevel"], 1);
    assert_eq!(result["data"]["migrated"], true);
}

#[test]
fn missing_patch_path_is_an_error() {
    let registry = PatchRegistry::new();
    let doc = json!({"patch-level": 1, "patch-sublevel": 0});
    let err = registry.migrate_to(doc, (2, 0)).unwrap_err();
    assert!(matches!(err, PatchError::NoPath(_, _)));
}

#[test]
fn document_newer_than_target_is_an_error() {
    let registry = PatchRegistry::new();
    let doc = json!({"patch-level": 3, "patch-sublevel": 0});
    let err = registry.migrate_to(doc, (1, 0)).unwrap_err();
    assert!(matches!(err, PatchError::TooNew(_, _)));
}

#[test]
fn missing_version_fields_default_to_one_zero() {
    let registry = PatchRegistry::new();
    let doc = json!({});
    let result = registry.migrate_to(doc, (1, 0)).unwrap();
    assert_eq!(result, json!({}));
}
