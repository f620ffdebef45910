//! Flat path-indexed store of field records.
//!
//! The key set mirrors the addressable paths of the value tree (root
//! included). Records are shared as `Arc`s: operations only allocate new
//! records for the paths they change, so untouched records stay
//! pointer-equal between snapshots.

use crate::options::Keep;
use crate::record::{FieldMeta, FieldRecord, RecordPatch};
use crate::reindex::{remap_entries, ArrayEdit};
use crate::tree;
use crate::{Issue, Path};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldStore {
    records: BTreeMap<Path, Arc<FieldRecord>>,
}

impl FieldStore {
    /// Build a store with one fresh record per addressable path of `tree`.
    pub fn build(tree: &Value) -> Self {
        let mut records = BTreeMap::new();
        records.insert(Path::root(), Arc::new(FieldRecord::fresh()));
        for path in tree::enumerate(tree) {
            records.insert(path, Arc::new(FieldRecord::fresh()));
        }
        Self { records }
    }

    /// Direct lookup. A miss means "treat as a default record".
    #[inline]
    pub fn get(&self, path: &Path) -> Option<&Arc<FieldRecord>> {
        self.records.get(path)
    }

    /// Meta of the record at `path`, or default flags if it is not tracked.
    pub fn meta(&self, path: &Path) -> FieldMeta {
        self.get(path).map(|r| r.meta).unwrap_or_default()
    }

    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Arc<FieldRecord>)> {
        self.records.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.records.keys()
    }

    /// Apply `patch` to the record at `path` and merge its meta into every
    /// ascendant. Missing records along the way are materialised fresh.
    pub fn set(&mut self, path: &Path, patch: RecordPatch) {
        for ascendant in path.ascendants() {
            let is_target = &ascendant == path;
            let current = self.records.get(&ascendant);
            let mut next = current
                .map(|r| FieldRecord::clone(r))
                .unwrap_or_else(FieldRecord::fresh);
            next.meta = patch.meta.apply(next.meta);
            if is_target {
                if let Some(errors) = &patch.errors {
                    next.errors = errors.clone();
                }
                if let Some(handle) = &patch.handle {
                    next.handle = handle.clone();
                }
            }
            if current.map_or(true, |r| **r != next) {
                self.records.insert(ascendant, Arc::new(next));
            }
        }
    }

    /// Drop the record at `path` and all descendants, then rebuild fresh
    /// records for that subtree from `tree`.
    pub fn reset(&mut self, path: &Path, tree: &Value) {
        self.reset_keeping(path, tree, Keep::default());
    }

    /// Like [`reset`](Self::reset), but carry selected parts of the old
    /// records over to rebuilt records at the same path.
    pub fn reset_keeping(&mut self, path: &Path, tree: &Value, keep: Keep) {
        let old = self.take_subtree(path, true);
        let Some(value) = tree::read(tree, path) else {
            if path.is_root() {
                self.records
                    .insert(Path::root(), Arc::new(FieldRecord::fresh()));
            }
            return;
        };
        let rebuilt = std::iter::once(path.clone()).chain(tree::enumerate_from(value, path));
        for p in rebuilt {
            let mut record = FieldRecord::fresh();
            if let Some(previous) = old.get(&p) {
                if keep.meta {
                    record.meta = previous.meta;
                }
                if keep.errors {
                    record.errors = previous.errors.clone();
                }
                if keep.refs {
                    record.handle = previous.handle.clone();
                }
            }
            self.records.insert(p, Arc::new(record));
        }
    }

    /// Rebuild the descendants of `path` from `tree`, leaving the record at
    /// `path` itself in place.
    pub fn rebuild_descendants(&mut self, path: &Path, tree: &Value) {
        self.take_subtree(path, false);
        if let Some(value) = tree::read(tree, path) {
            for p in tree::enumerate_from(value, path) {
                self.records.insert(p, Arc::new(FieldRecord::fresh()));
            }
        }
    }

    /// Reconcile the key set with `tree`: add fresh records for new paths and
    /// drop records whose path no longer exists. Existing records are kept.
    pub fn adjust(&mut self, tree: &Value) {
        let mut live: BTreeSet<Path> = tree::enumerate(tree).into_iter().collect();
        live.insert(Path::root());
        self.records.retain(|path, _| live.contains(path));
        for path in live {
            self.records
                .entry(path)
                .or_insert_with(|| Arc::new(FieldRecord::fresh()));
        }
    }

    /// Move item records of the array at `array` to follow `edit`.
    pub fn remap(&mut self, array: &Path, edit: &ArrayEdit) {
        self.records = remap_entries(&self.records, array, edit);
    }

    /// Mirror `errors` into each record's own error list.
    ///
    /// When `scope` is given only records it accepts are touched. Records
    /// whose errors already match keep their identity.
    pub fn sync_errors(
        &mut self,
        errors: &BTreeMap<Path, Vec<Issue>>,
        scope: impl Fn(&Path) -> bool,
    ) {
        for (path, record) in self.records.iter_mut() {
            if !scope(path) {
                continue;
            }
            let desired = errors.get(path).map(Vec::as_slice).unwrap_or(&[]);
            if record.errors.as_slice() != desired {
                let mut next = FieldRecord::clone(record);
                next.errors = desired.to_vec();
                *record = Arc::new(next);
            }
        }
    }

    fn take_subtree(&mut self, path: &Path, include_self: bool) -> BTreeMap<Path, Arc<FieldRecord>> {
        let mut taken = BTreeMap::new();
        let keys: Vec<Path> = self
            .records
            .keys()
            .filter(|p| p.is_descendant_of(path) || (include_self && *p == path))
            .cloned()
            .collect();
        for key in keys {
            if let Some(record) = self.records.remove(&key) {
                taken.insert(key, record);
            }
        }
        taken
    }
}
