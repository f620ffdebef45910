//! Derived, read-only projection of the persisted form state.
//!
//! [`FormView::derive`] is a pure function of a [`FormState`] snapshot. The
//! form publishes views through a watch channel and only notifies when the
//! derived view actually differs from the last one.

use crate::form::FormState;
use crate::record::FieldId;
use crate::{tree, Path};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Persisted form-level counters and flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FormStatus {
    pub submits: u32,
    pub submitting: bool,
    pub validating: bool,
    pub successful: bool,
    /// Sticky flag set by any dirtying mutation until the next form reset.
    pub dirty: bool,
}

/// Form status as observers see it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub submits: u32,
    pub submitting: bool,
    pub validating: bool,
    pub successful: bool,
    /// Explicit flag or any dirty record.
    pub dirty: bool,
    /// No error bucket is non-empty.
    pub valid: bool,
    pub submitted: bool,
}

impl StatusView {
    /// Form-level status of a snapshot, without deriving per-field views.
    pub fn derive(state: &FormState) -> Self {
        let any_dirty = state.records.iter().any(|(_, r)| r.meta.dirty);
        Self {
            submits: state.status.submits,
            submitting: state.status.submitting,
            validating: state.status.validating,
            successful: state.status.successful,
            dirty: state.status.dirty || any_dirty,
            valid: state.errors.values().all(Vec::is_empty),
            submitted: state.status.submits > 0,
        }
    }
}

/// Computed per-field state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FieldView {
    pub id: Option<FieldId>,
    pub touched: bool,
    pub dirty: bool,
    pub blurred: bool,
    /// Current value equals the default value at this path.
    pub default: bool,
    pub valid: bool,
    pub pristine: bool,
}

impl FieldView {
    /// Compute the view of one path; untracked paths read as default records.
    pub fn derive(state: &FormState, path: &Path) -> Self {
        let record = state.records.get(path);
        let meta = record.map(|r| r.meta).unwrap_or_default();
        let current = tree::read(&state.values, path);
        let default = tree::read(&state.defaults, path);
        Self {
            id: record.map(|r| r.id),
            touched: meta.touched,
            dirty: meta.dirty,
            blurred: meta.blurred,
            default: same_value(current, default),
            valid: state.errors.get(path).map_or(true, Vec::is_empty),
            pristine: !meta.dirty,
        }
    }
}

/// A missing value and an explicit `null` both count as "nothing".
fn same_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        (None, Some(Value::Null)) | (Some(Value::Null), None) => true,
        _ => false,
    }
}

/// Everything an observer reads.
#[derive(Clone, Debug, PartialEq)]
pub struct FormView {
    pub values: Arc<Value>,
    pub fields: BTreeMap<Path, FieldView>,
    pub status: StatusView,
}

impl FormView {
    pub fn derive(state: &FormState) -> Self {
        let fields: BTreeMap<Path, FieldView> = state
            .records
            .paths()
            .map(|path| (path.clone(), FieldView::derive(state, path)))
            .collect();
        Self {
            values: state.values.clone(),
            fields,
            status: StatusView::derive(state),
        }
    }

    pub fn field(&self, path: &Path) -> Option<&FieldView> {
        self.fields.get(path)
    }
}
