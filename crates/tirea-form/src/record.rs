//! Per-path field records.

use crate::Issue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Stable identity of a field record.
///
/// Generated once when the record is created; it is the only part of a record
/// that list consumers should key on, since it follows the item through
/// structural array edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(Uuid);

impl FieldId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Persisted interaction flags for a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub touched: bool,
    pub dirty: bool,
    pub blurred: bool,
}

/// Field-by-field meta update. `None` keeps the prior value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaPatch {
    pub touched: Option<bool>,
    pub dirty: Option<bool>,
    pub blurred: Option<bool>,
}

impl MetaPatch {
    pub fn touched(mut self, value: bool) -> Self {
        self.touched = Some(value);
        self
    }

    pub fn dirty(mut self, value: bool) -> Self {
        self.dirty = Some(value);
        self
    }

    pub fn blurred(mut self, value: bool) -> Self {
        self.blurred = Some(value);
        self
    }

    /// Patch that clears every flag.
    pub fn cleared() -> Self {
        Self {
            touched: Some(false),
            dirty: Some(false),
            blurred: Some(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_none() && self.dirty.is_none() && self.blurred.is_none()
    }

    pub fn apply(&self, meta: FieldMeta) -> FieldMeta {
        FieldMeta {
            touched: self.touched.unwrap_or(meta.touched),
            dirty: self.dirty.unwrap_or(meta.dirty),
            blurred: self.blurred.unwrap_or(meta.blurred),
        }
    }
}

/// External element bound to a field (for example a UI input).
///
/// The engine never constructs or destroys handles; it only forwards focus
/// and blur requests to whatever was registered.
pub trait FieldHandle: Send + Sync {
    fn focus(&self);
    fn blur(&self);
}

/// Non-owning link from a record to its registered handle.
#[derive(Clone)]
pub struct HandleRef(Weak<dyn FieldHandle>);

impl HandleRef {
    pub fn new(handle: &Arc<dyn FieldHandle>) -> Self {
        Self(Arc::downgrade(handle))
    }

    /// The handle, if its owner still holds it.
    pub fn upgrade(&self) -> Option<Arc<dyn FieldHandle>> {
        self.0.upgrade()
    }

    pub fn is_same(&self, other: &HandleRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.0.strong_count() > 0 {
            "live"
        } else {
            "dropped"
        };
        f.debug_tuple("HandleRef").field(&state).finish()
    }
}

/// Persisted state for one addressable path.
#[derive(Clone, Debug)]
pub struct FieldRecord {
    pub id: FieldId,
    pub meta: FieldMeta,
    pub errors: Vec<Issue>,
    pub handle: Option<HandleRef>,
}

impl FieldRecord {
    /// A record with a fresh id and default state.
    pub fn fresh() -> Self {
        Self {
            id: FieldId::generate(),
            meta: FieldMeta::default(),
            errors: Vec::new(),
            handle: None,
        }
    }
}

impl PartialEq for FieldRecord {
    fn eq(&self, other: &Self) -> bool {
        let handles_match = match (&self.handle, &other.handle) {
            (None, None) => true,
            (Some(a), Some(b)) => a.is_same(b),
            _ => false,
        };
        self.id == other.id
            && self.meta == other.meta
            && self.errors == other.errors
            && handles_match
    }
}

/// Update applied to a record by [`FieldStore::set`](crate::FieldStore::set).
///
/// Only `meta` propagates to ascendants; `errors` and `handle` apply to the
/// target path alone.
#[derive(Clone, Debug, Default)]
pub struct RecordPatch {
    pub meta: MetaPatch,
    pub errors: Option<Vec<Issue>>,
    /// `Some(None)` clears the handle.
    pub handle: Option<Option<HandleRef>>,
}

impl RecordPatch {
    pub fn meta(meta: MetaPatch) -> Self {
        Self {
            meta,
            ..Default::default()
        }
    }

    pub fn errors(errors: Vec<Issue>) -> Self {
        Self {
            errors: Some(errors),
            ..Default::default()
        }
    }

    pub fn handle(handle: Option<HandleRef>) -> Self {
        Self {
            handle: Some(handle),
            ..Default::default()
        }
    }
}
