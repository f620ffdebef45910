use super::Form;
use crate::error::{value_type_name, FormError, FormResult};
use crate::options::{Effects, Should, ValidateOptions};
use crate::record::FieldId;
use crate::reindex::{clamp_existing, ArrayEdit};
use crate::validation::ValidationType;
use crate::{tree, Path};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Structural operations on an array-valued field.
///
/// Every operation moves per-item records and error buckets together with
/// the items, so an item's [`FieldId`] survives shifts. Indices are clamped
/// into range; an edit that clamps to a no-op leaves the form untouched.
#[derive(Clone, Debug)]
pub struct ArrayField<'a> {
    form: &'a Form,
    path: Path,
}

impl<'a> ArrayField<'a> {
    pub(crate) fn new(form: &'a Form, path: Path) -> Self {
        Self { form, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current items; a missing or `null` value reads as empty.
    pub fn items(&self) -> FormResult<Vec<Value>> {
        tree::array_at(&self.form.snapshot().values, &self.path)
    }

    pub fn len(&self) -> usize {
        self.items().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record id and path of every item, in order.
    pub fn fields(&self) -> Vec<(FieldId, Path)> {
        let snapshot = self.form.snapshot();
        let len = tree::array_at(&snapshot.values, &self.path)
            .map(|items| items.len())
            .unwrap_or(0);
        (0..len)
            .map(|i| self.path.clone().index(i))
            .filter_map(|p| snapshot.records.get(&p).map(|r| (r.id, p)))
            .collect()
    }

    /// Insert `value` before `index` (clamped to the length).
    pub async fn insert(&self, index: usize, value: Value, should: Should) -> FormResult<()> {
        self.edit(ArrayEdit::Insert { index, value }, should).await
    }

    pub async fn append(&self, value: Value, should: Should) -> FormResult<()> {
        self.insert(usize::MAX, value, should).await
    }

    pub async fn prepend(&self, value: Value, should: Should) -> FormResult<()> {
        self.insert(0, value, should).await
    }

    pub async fn swap(&self, a: usize, b: usize, should: Should) -> FormResult<()> {
        self.edit(ArrayEdit::Swap { a, b }, should).await
    }

    /// Take the item at `from` out and reinsert it at `to`.
    pub async fn move_item(&self, from: usize, to: usize, should: Should) -> FormResult<()> {
        self.edit(ArrayEdit::Move { from, to }, should).await
    }

    /// Remove the item at `index`.
    ///
    /// Always marks the array dirty and touched, and never validates.
    pub fn remove(&self, index: usize) -> FormResult<()> {
        let effects = Effects {
            validate: false,
            dirty: true,
            touch: true,
        };
        self.apply(ArrayEdit::Remove { index }, &effects)?;
        Ok(())
    }

    /// Replace the item at `index` in place; its record subtree starts fresh.
    pub async fn update(&self, index: usize, value: Value, should: Should) -> FormResult<()> {
        let effects = self.form.effects(should);
        let updated = self.form.try_commit(|state| {
            let len = tree::array_at(&state.values, &self.path)?.len();
            let Some(index) = clamp_existing(index, len) else {
                return Ok(None);
            };
            let item = self.path.clone().index(index);
            state.write_value(&item, value)?;
            state.records.reset(&item, &state.values);
            state.clear_errors(|p| item.is_prefix_of(p));
            state.mark(&item, &effects);
            Ok(Some(index))
        })?;
        let Some(index) = updated else {
            return Ok(());
        };
        debug!(path = %self.path, index, "array item updated");
        self.validate_after(&effects).await
    }

    /// Replace the whole array; item records are rebuilt from scratch.
    pub async fn replace(&self, value: Value, should: Should) -> FormResult<()> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(FormError::type_mismatch(
                    self.path.clone(),
                    "array",
                    value_type_name(&other),
                ))
            }
        };
        let len = items.len();
        let effects = self.form.effects(should);
        self.form.try_commit(|state| {
            tree::array_at(&state.values, &self.path)?;
            state.values = Arc::new(tree::write(&state.values, &self.path, Value::Array(items))?);
            state.records.rebuild_descendants(&self.path, &state.values);
            state.records.adjust(&state.values);
            let path = &self.path;
            state.clear_errors(|p| p.is_descendant_of(path));
            state.mark(&self.path, &effects);
            Ok(())
        })?;
        debug!(path = %self.path, len, "array replaced");
        self.validate_after(&effects).await
    }

    async fn edit(&self, edit: ArrayEdit, should: Should) -> FormResult<()> {
        let effects = self.form.effects(should);
        if self.apply(edit, &effects)? {
            self.validate_after(&effects).await?;
        }
        Ok(())
    }

    fn apply(&self, edit: ArrayEdit, effects: &Effects) -> FormResult<bool> {
        let op = edit.name();
        let changed = self.form.try_commit(|state| {
            let changed = state.apply_array_edit(&self.path, edit)?;
            if changed {
                state.mark(&self.path, effects);
            }
            Ok(changed)
        })?;
        if changed {
            debug!(path = %self.path, op, "array edited");
        }
        Ok(changed)
    }

    async fn validate_after(&self, effects: &Effects) -> FormResult<()> {
        if effects.validate {
            self.form
                .validate(
                    Some(vec![self.path.clone()]),
                    ValidateOptions::of(ValidationType::Change),
                )
                .await?;
        }
        Ok(())
    }
}
