//! Tests for record identity across structural array operations.

use serde_json::json;
use tirea_form::{path, ErrorMode, FieldId, FieldResetOptions, Form, Issue, Keep, Path, Should};

fn ids(form: &Form, path: &str) -> Vec<FieldId> {
    form.array(path).fields().into_iter().map(|(id, _)| id).collect()
}

// ============================================================================
// Identity under shift
// ============================================================================

#[tokio::test]
async fn test_insert_keeps_shifted_record_state() {
    let form = Form::new(json!({"items": ["a", "b", "c"]}));
    form.field("items.1")
        .set_errors(vec![Issue::at("items.1", "bad b")], ErrorMode::Replace);
    form.field("items.1").blur().await.unwrap();
    let before = ids(&form, "items");

    form.array("items")
        .insert(1, json!("x"), Should::new())
        .await
        .unwrap();

    assert_eq!(form.values()["items"], json!(["a", "x", "b", "c"]));
    let after = ids(&form, "items");
    assert_eq!(after[2], before[1]);
    assert!(form.meta("items.2").blurred);
    assert_eq!(form.errors("items.2")[0].message, "bad b");

    let fresh = form.meta("items.1");
    assert!(!fresh.dirty && !fresh.touched && !fresh.blurred);
    assert!(form.errors("items.1").is_empty());
}

#[tokio::test]
async fn test_remove_after_insert_restores_ids() {
    let form = Form::new(json!({"items": ["a", "b", "c"]}));
    let original = ids(&form, "items");

    form.array("items")
        .insert(1, json!("x"), Should::new())
        .await
        .unwrap();
    form.field("items.2")
        .change(json!("b!"), Should::new().validate(false))
        .await
        .unwrap();
    form.array("items").remove(1).unwrap();

    assert_eq!(ids(&form, "items"), original);
    assert_eq!(form.values()["items"], json!(["a", "b!", "c"]));
    // interim mutation travels with the record
    assert!(form.meta("items.1").dirty);
    assert!(!form.meta("items.0").dirty);
}

#[tokio::test]
async fn test_move_round_trip() {
    let form = Form::new(json!({"items": ["a", "b", "c"]}));
    let original = ids(&form, "items");

    form.array("items").move_item(0, 2, Should::new()).await.unwrap();
    assert_eq!(form.values()["items"], json!(["b", "c", "a"]));
    assert_eq!(ids(&form, "items"), vec![original[1], original[2], original[0]]);

    form.array("items").move_item(2, 0, Should::new()).await.unwrap();
    assert_eq!(form.values()["items"], json!(["a", "b", "c"]));
    assert_eq!(ids(&form, "items"), original);
}

#[tokio::test]
async fn test_move_onto_itself_is_noop() {
    let form = Form::new(json!({"items": ["a", "b"]}));
    let before = form.snapshot();
    form.array("items").move_item(1, 1, Should::new()).await.unwrap();
    assert_eq!(*form.snapshot(), *before);
}

#[tokio::test]
async fn test_nested_item_records_follow_items() {
    let form = Form::new(json!({"rows": [{"v": 1}, {"v": 2}]}));
    form.field("rows.0.v")
        .change(json!(10), Should::new())
        .await
        .unwrap();
    let leaf = form.meta("rows.0.v").id;

    form.array("rows").prepend(json!({"v": 0}), Should::new()).await.unwrap();

    assert_eq!(form.meta("rows.1.v").id, leaf);
    assert!(form.meta("rows.1.v").dirty);
    assert!(!form.meta("rows.0.v").dirty);
}

#[tokio::test]
async fn test_should_skips_dirtying_programmatic_append() {
    let form = Form::new(json!({"items": []}));
    form.array("items")
        .append(json!("a"), Should::nothing())
        .await
        .unwrap();
    assert!(!form.meta("items").dirty);
    assert!(!form.status().dirty);
}

// ============================================================================
// Concrete scenario
// ============================================================================

#[tokio::test]
async fn test_tags_append_then_remove() {
    let form = Form::new(json!({"tags": ["x", "y"]}));

    form.array("tags").append(json!("z"), Should::new()).await.unwrap();
    assert_eq!(form.values()["tags"], json!(["x", "y", "z"]));
    assert!(form.meta("tags").dirty);

    let y = form.meta("tags.1").id;
    form.array("tags").remove(0).unwrap();
    assert_eq!(form.values()["tags"], json!(["y", "z"]));
    assert_eq!(form.meta("tags.0").id, y);
}

// ============================================================================
// Shrinking through change
// ============================================================================

#[tokio::test]
async fn test_change_that_shrinks_array_drops_vanished_errors() {
    let form = Form::new(json!({"tags": ["a", "b", "c"]}));
    form.field("tags.2")
        .set_errors(vec![Issue::at("tags.2", "bad c")], ErrorMode::Replace);
    form.field(Path::root())
        .set_errors(vec![Issue::new("form level")], ErrorMode::Replace);
    form.field("tags.7")
        .set_errors(vec![Issue::at("tags.7", "ahead of value")], ErrorMode::Replace);

    form.field("tags")
        .change(json!(["a"]), Should::new())
        .await
        .unwrap();

    let snapshot = form.snapshot();
    assert!(!snapshot.records.contains(&path!("tags", 2)));
    let errors = form.error_map();
    assert!(!errors.contains_key(&path!("tags", 2)));
    assert_eq!(errors[&Path::root()][0].message, "form level");
    assert_eq!(errors[&path!("tags", 7)][0].message, "ahead of value");

    form.field(Path::root()).set_errors(vec![], ErrorMode::Replace);
    form.field("tags.7").set_errors(vec![], ErrorMode::Replace);
    assert!(form.status().valid);
}

#[test]
fn test_reset_keeping_errors_drops_vanished_item_errors() {
    let form = Form::new(json!({"tags": ["a", "b"]}));
    form.field("tags.1")
        .set_errors(vec![Issue::at("tags.1", "bad b")], ErrorMode::Replace);

    form.field("tags")
        .reset(FieldResetOptions {
            value: Some(json!([])),
            keep: Keep {
                errors: true,
                ..Keep::default()
            },
            ..Default::default()
        })
        .unwrap();

    assert!(form.errors("tags.1").is_empty());
    assert!(form.status().valid);
}
