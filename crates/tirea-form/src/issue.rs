//! Validation issues and the validator result shape.

use crate::{Path, Seg};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single path-addressed validation issue.
///
/// Issues without a path (or with an empty one) belong to the tree root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Seg>>,
}

impl Issue {
    /// Create an issue attached to the root.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Create an issue attached to `path`.
    pub fn at(path: impl Into<Path>, message: impl Into<String>) -> Self {
        let path: Path = path.into();
        Self {
            message: message.into(),
            path: Some(path.into_iter().collect()),
        }
    }

    /// The path this issue is bucketed under.
    pub fn field_path(&self) -> Path {
        match &self.path {
            Some(segments) => Path::from_segments(segments.clone()),
            None => Path::root(),
        }
    }
}

/// What a validator returns for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationOutcome {
    /// The document is valid; carries the (possibly transformed) value.
    Valid { value: Value },
    /// The document failed validation.
    Invalid { issues: Vec<Issue> },
}

impl ValidationOutcome {
    pub fn valid(value: Value) -> Self {
        ValidationOutcome::Valid { value }
    }

    pub fn invalid(issues: Vec<Issue>) -> Self {
        ValidationOutcome::Invalid { issues }
    }

    /// `Valid` carrying a copy of `input` when `issues` is empty.
    pub fn from_issues(input: &Value, issues: Vec<Issue>) -> Self {
        if issues.is_empty() {
            ValidationOutcome::valid(input.clone())
        } else {
            ValidationOutcome::invalid(issues)
        }
    }

    /// Consume the outcome, keeping only its issues.
    pub fn into_issues(self) -> Vec<Issue> {
        match self {
            ValidationOutcome::Valid { .. } => Vec::new(),
            ValidationOutcome::Invalid { issues } => issues,
        }
    }
}

/// Group issues by the path that produced them, preserving issue order.
///
/// Root issues land under [`Path::root`].
pub fn bucket_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> BTreeMap<Path, Vec<Issue>> {
    let mut buckets: BTreeMap<Path, Vec<Issue>> = BTreeMap::new();
    for issue in issues {
        buckets
            .entry(issue.field_path())
            .or_default()
            .push(issue.clone());
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_bucket_issues_groups_by_path() {
        let issues = vec![
            Issue::at("name", "required"),
            Issue::new("form broken"),
            Issue::at("name", "too short"),
            Issue::at("tags.1", "bad tag"),
        ];
        let buckets = bucket_issues(&issues);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[&path!("name")].len(), 2);
        assert_eq!(buckets[&path!("name")][1].message, "too short");
        assert_eq!(buckets[&Path::root()][0].message, "form broken");
        assert!(buckets.contains_key(&path!("tags", 1)));
    }

    #[test]
    fn test_empty_issue_path_is_root() {
        let issue = Issue {
            message: "m".into(),
            path: Some(vec![]),
        };
        assert!(issue.field_path().is_root());
    }

    #[test]
    fn test_outcome_deserializes_both_shapes() {
        let ok: ValidationOutcome = serde_json::from_value(json!({"value": {"a": 1}})).unwrap();
        assert_eq!(ok, ValidationOutcome::valid(json!({"a": 1})));

        let bad: ValidationOutcome = serde_json::from_value(json!({
            "issues": [{"message": "required", "path": ["users", 0, "email"]}]
        }))
        .unwrap();
        let issues = bad.into_issues();
        assert_eq!(issues[0].field_path(), path!("users", 0, "email"));
    }
}
