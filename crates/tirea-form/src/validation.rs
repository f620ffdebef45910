//! Validator contract and the pure parts of validation orchestration.
//!
//! A [`Validator`] checks the whole value tree and returns path-addressed
//! issues. The helpers here pick which validator runs, work out which paths a
//! run is allowed to touch, and merge a run's issues into the persisted error
//! map. The stateful part (the `validating` flag, committing results) lives
//! on [`Form::validate`](crate::Form::validate).

use crate::error::ValidatorError;
use crate::form::FormState;
use crate::issue::bucket_issues;
use crate::{Issue, Path, ValidationOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Schema check over a complete value tree.
///
/// Implementations may resolve immediately or suspend; failures are returned
/// as [`ValidatorError`] and propagated to the caller unchanged.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, input: &Value) -> Result<ValidationOutcome, ValidatorError>;
}

/// Adapter turning a synchronous closure into a [`Validator`].
pub struct FnValidator<F>(F);

/// Wrap a synchronous closure as a validator.
///
/// ```
/// use tirea_form::{validator_fn, Issue, ValidationOutcome};
///
/// let required_name = validator_fn(|input| {
///     let name = input.get("name").and_then(|v| v.as_str()).unwrap_or_default();
///     let issues = if name.is_empty() {
///         vec![Issue::at("name", "required")]
///     } else {
///         vec![]
///     };
///     Ok(ValidationOutcome::from_issues(input, issues))
/// });
/// # let _ = required_name;
/// ```
pub fn validator_fn<F>(f: F) -> FnValidator<F>
where
    F: Fn(&Value) -> Result<ValidationOutcome, ValidatorError> + Send + Sync,
{
    FnValidator(f)
}

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Result<ValidationOutcome, ValidatorError> + Send + Sync,
{
    async fn validate(&self, input: &Value) -> Result<ValidationOutcome, ValidatorError> {
        (self.0)(input)
    }
}

/// The interaction that triggered a validation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    Change,
    Submit,
    Blur,
    Focus,
}

type ValidatorFactory = dyn Fn(&FormState) -> Option<Arc<dyn Validator>> + Send + Sync;

/// A configured validator, fixed or chosen from the current state.
#[derive(Clone)]
pub enum ValidatorSource {
    Static(Arc<dyn Validator>),
    Dynamic(Arc<ValidatorFactory>),
}

impl ValidatorSource {
    pub fn resolve(&self, state: &FormState) -> Option<Arc<dyn Validator>> {
        match self {
            ValidatorSource::Static(v) => Some(v.clone()),
            ValidatorSource::Dynamic(factory) => factory(state),
        }
    }
}

impl fmt::Debug for ValidatorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorSource::Static(_) => f.write_str("ValidatorSource::Static"),
            ValidatorSource::Dynamic(_) => f.write_str("ValidatorSource::Dynamic"),
        }
    }
}

/// Base schema plus per-interaction validators.
#[derive(Clone, Debug, Default)]
pub struct Validators {
    pub schema: Option<ValidatorSource>,
    pub by_type: HashMap<ValidationType, ValidatorSource>,
}

impl Validators {
    /// Pick the validator for a run.
    ///
    /// Untyped runs use the base schema. Typed runs use their own entry;
    /// `Submit` falls back to the base schema, every other type to nothing.
    pub fn resolve(
        &self,
        kind: Option<ValidationType>,
        state: &FormState,
    ) -> Option<Arc<dyn Validator>> {
        let source = match kind {
            None => self.schema.as_ref(),
            Some(kind) => match self.by_type.get(&kind) {
                Some(source) => Some(source),
                None if kind == ValidationType::Submit => self.schema.as_ref(),
                None => None,
            },
        }?;
        source.resolve(state)
    }
}

/// Field -> other fields validated alongside it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelatedPaths(HashMap<Path, Vec<Path>>);

impl RelatedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: Path, related: Vec<Path>) {
        self.0.entry(path).or_default().extend(related);
    }

    pub fn get(&self, path: &Path) -> &[Path] {
        self.0.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The requested paths plus everything declared related to them.
    pub fn expand(&self, paths: &[Path]) -> AffectedPaths {
        let mut roots = Vec::new();
        for path in paths {
            roots.push(path.clone());
            roots.extend(self.get(path).iter().cloned());
        }
        roots.sort();
        roots.dedup();
        AffectedPaths { roots }
    }
}

impl From<&BTreeMap<String, Vec<String>>> for RelatedPaths {
    fn from(raw: &BTreeMap<String, Vec<String>>) -> Self {
        let mut related = RelatedPaths::new();
        for (path, others) in raw {
            related.insert(
                Path::parse(path),
                others.iter().map(|p| Path::parse(p)).collect(),
            );
        }
        related
    }
}

/// The subtrees a partial validation run may write errors for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffectedPaths {
    roots: Vec<Path>,
}

impl AffectedPaths {
    /// Whether `path` equals or lies below one of the affected roots.
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| root.is_prefix_of(path))
    }

    pub fn roots(&self) -> &[Path] {
        &self.roots
    }
}

/// Keep only the issues a run is allowed to report.
pub fn filter_issues(issues: Vec<Issue>, affected: Option<&AffectedPaths>) -> Vec<Issue> {
    match affected {
        None => issues,
        Some(affected) => issues
            .into_iter()
            .filter(|issue| affected.contains(&issue.field_path()))
            .collect(),
    }
}

/// Merge a run's issues into the persisted error map.
///
/// Without `affected` the map is replaced wholesale. With it, buckets inside
/// the affected subtrees are replaced (cleared when no issue maps there) and
/// every other bucket is left as it was.
pub fn merge_errors(
    existing: &BTreeMap<Path, Vec<Issue>>,
    issues: &[Issue],
    affected: Option<&AffectedPaths>,
) -> BTreeMap<Path, Vec<Issue>> {
    let buckets = bucket_issues(issues);
    let Some(affected) = affected else {
        return buckets;
    };
    let mut merged: BTreeMap<Path, Vec<Issue>> = existing
        .iter()
        .filter(|(path, _)| !affected.contains(path))
        .map(|(path, bucket)| (path.clone(), bucket.clone()))
        .collect();
    for (path, bucket) in buckets {
        if affected.contains(&path) {
            merged.insert(path, bucket);
        }
    }
    merged
}
