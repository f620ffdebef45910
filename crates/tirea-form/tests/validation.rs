//! Tests for validation orchestration: bucketing, scoping and the
//! `validating` flag under async and failing validators.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tirea_form::{
    path, validator_fn, Form, FormError, Issue, Path, Should, ValidateOptions, ValidationOutcome,
    ValidationType, Validator, ValidatorError,
};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn name_and_nested(input: &Value) -> Result<ValidationOutcome, ValidatorError> {
    let mut issues = Vec::new();
    if input["name"] == "" {
        issues.push(Issue::at("name", "name required"));
    }
    if input["nested"]["value"].as_i64().unwrap_or(0) < 0 {
        issues.push(Issue::at("nested.value", "must be positive"));
    }
    if input["nested"]["value"].as_i64() == Some(-2) {
        issues.push(Issue::new("form level"));
    }
    Ok(ValidationOutcome::from_issues(input, issues))
}

/// Validator that suspends until the test releases it.
struct Gated {
    gates: Mutex<Vec<oneshot::Receiver<Vec<Issue>>>>,
}

impl Gated {
    fn new(count: usize) -> (Arc<Self>, Vec<oneshot::Sender<Vec<Issue>>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..count).map(|_| oneshot::channel()).unzip();
        let gated = Arc::new(Self {
            gates: Mutex::new(receivers.into_iter().rev().collect()),
        });
        (gated, senders)
    }
}

#[async_trait]
impl Validator for Gated {
    async fn validate(&self, input: &Value) -> Result<ValidationOutcome, ValidatorError> {
        let gate = self.gates.lock().unwrap().pop();
        let Some(gate) = gate else {
            return Ok(ValidationOutcome::valid(input.clone()));
        };
        let issues = gate.await.map_err(|_| ValidatorError::msg("gate dropped"))?;
        Ok(ValidationOutcome::from_issues(input, issues))
    }
}

struct Shared(Arc<Gated>);

#[async_trait]
impl Validator for Shared {
    async fn validate(&self, input: &Value) -> Result<ValidationOutcome, ValidatorError> {
        self.0.validate(input).await
    }
}

// ============================================================================
// Bucketing and scope
// ============================================================================

#[tokio::test]
async fn test_full_validation_buckets_by_path() {
    let form = Form::builder()
        .defaults(json!({"name": "", "nested": {"value": -2}}))
        .schema(validator_fn(name_and_nested))
        .build();

    let issues = form.validate(None, ValidateOptions::default()).await.unwrap();
    assert_eq!(issues.len(), 3);

    let errors = form.error_map();
    assert_eq!(errors[&path!("name")][0].message, "name required");
    assert_eq!(errors[&path!("nested", "value")][0].message, "must be positive");
    assert_eq!(errors[&Path::root()][0].message, "form level");
    assert!(!form.status().valid);
    assert!(!form.meta("nested.value").valid);
    assert_eq!(
        form.snapshot().records.get(&path!("nested", "value")).unwrap().errors.len(),
        1
    );
}

#[tokio::test]
async fn test_partial_validation_leaves_other_buckets() {
    let form = Form::builder()
        .defaults(json!({"name": "", "nested": {"value": -1}}))
        .schema(validator_fn(name_and_nested))
        .build();
    form.field("name")
        .set_errors(vec![Issue::at("name", "stale name error")], Default::default());

    form.validate(Some(vec![path!("nested")]), ValidateOptions::default())
        .await
        .unwrap();

    assert_eq!(form.errors("name")[0].message, "stale name error");
    assert_eq!(form.errors("nested.value")[0].message, "must be positive");

    form.field("nested.value")
        .change(json!(5), Should::new().validate(false))
        .await
        .unwrap();
    form.validate(Some(vec![path!("nested")]), ValidateOptions::default())
        .await
        .unwrap();
    assert!(form.errors("nested.value").is_empty());
    assert_eq!(form.errors("name")[0].message, "stale name error");
}

#[tokio::test]
async fn test_related_paths_join_scope() {
    let form = Form::builder()
        .defaults(json!({"password": "a", "confirm": "b"}))
        .validator(
            ValidationType::Change,
            validator_fn(|v| {
                let issues = if v["password"] != v["confirm"] {
                    vec![Issue::at("confirm", "does not match")]
                } else {
                    vec![]
                };
                Ok(ValidationOutcome::from_issues(v, issues))
            }),
        )
        .related("password", ["confirm"])
        .build();

    form.field("password")
        .change(json!("c"), Should::new())
        .await
        .unwrap();
    assert_eq!(form.errors("confirm")[0].message, "does not match");

    form.field("password")
        .change(json!("b"), Should::new())
        .await
        .unwrap();
    assert!(form.errors("confirm").is_empty());
}

#[tokio::test]
async fn test_untyped_kinds_without_validator_are_noops() {
    let form = Form::builder()
        .defaults(json!({"name": ""}))
        .schema(validator_fn(name_and_nested))
        .build();
    form.field("name").blur().await.unwrap();
    assert!(form.errors("name").is_empty());

    form.validate(None, ValidateOptions::of(ValidationType::Submit))
        .await
        .unwrap();
    assert_eq!(form.errors("name").len(), 1);
}

// ============================================================================
// Validating flag
// ============================================================================

#[tokio::test]
async fn test_validating_flag_tracks_async_validator() {
    let (gated, mut senders) = Gated::new(1);
    let form = Form::builder()
        .defaults(json!({"name": ""}))
        .schema(Shared(gated))
        .build();

    let pending = tokio::spawn(form.validate(None, ValidateOptions::default()));
    assert!(form.status().validating);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(form.status().validating);
    assert!(form.view().status.validating);

    senders
        .remove(0)
        .send(vec![Issue::at("name", "late")])
        .unwrap();
    let issues = pending.await.unwrap().unwrap();

    assert_eq!(issues.len(), 1);
    assert!(!form.status().validating);
    assert_eq!(form.errors("name")[0].message, "late");
}

#[tokio::test]
async fn test_failing_validator_resets_flag() {
    init_tracing();
    let form = Form::builder()
        .defaults(json!({"name": ""}))
        .schema(validator_fn(|_| Err(ValidatorError::msg("schema exploded"))))
        .build();

    let err = form
        .validate(None, ValidateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FormError::Validator(_)));
    assert!(err.to_string().contains("schema exploded"));
    assert!(!form.status().validating);
}

#[tokio::test]
async fn test_overlapping_validations_last_write_wins() {
    init_tracing();
    let (gated, mut senders) = Gated::new(2);
    let form = Form::builder()
        .defaults(json!({"name": ""}))
        .schema(Shared(gated))
        .build();

    let first = tokio::spawn(form.validate(None, ValidateOptions::default()));
    let second = tokio::spawn(form.validate(None, ValidateOptions::default()));
    let second_gate = senders.pop().unwrap();
    let first_gate = senders.pop().unwrap();

    second_gate
        .send(vec![Issue::at("name", "from second")])
        .unwrap();
    second.await.unwrap().unwrap();
    assert!(!form.status().validating);

    first_gate.send(vec![Issue::at("name", "from first")]).unwrap();
    first.await.unwrap().unwrap();
    assert_eq!(form.errors("name")[0].message, "from first");
    assert!(!form.status().validating);
}
