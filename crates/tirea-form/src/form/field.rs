use super::{Form, FormState};
use crate::error::FormResult;
use crate::issue::Issue;
use crate::options::{ErrorMode, FieldResetOptions, Should, ValidateOptions};
use crate::record::{FieldHandle, HandleRef, MetaPatch, RecordPatch};
use crate::validation::ValidationType;
use crate::view::FieldView;
use crate::{tree, Path};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Operations on the field at one path.
#[derive(Clone, Debug)]
pub struct Field<'a> {
    form: &'a Form,
    path: Path,
}

impl<'a> Field<'a> {
    pub(crate) fn new(form: &'a Form, path: Path) -> Self {
        Self { form, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn value(&self) -> Option<Value> {
        tree::read(&self.form.snapshot().values, &self.path).cloned()
    }

    pub fn meta(&self) -> FieldView {
        FieldView::derive(&self.form.snapshot(), &self.path)
    }

    pub fn errors(&self) -> Vec<Issue> {
        self.form.snapshot().errors_at(&self.path).to_vec()
    }

    /// Set the value, mark this path and its ascendants, then validate.
    pub async fn change(&self, value: Value, should: Should) -> FormResult<()> {
        self.change_with(move |_| value, should).await
    }

    /// Like [`change`](Self::change), computing the new value from the
    /// current one.
    pub async fn change_with<F>(&self, updater: F, should: Should) -> FormResult<()>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let effects = self.form.effects(should);
        self.form.try_commit(|state| {
            let next = updater(tree::read(&state.values, &self.path));
            state.write_value(&self.path, next)?;
            state.mark(&self.path, &effects);
            Ok(())
        })?;
        trace!(path = %self.path, "field changed");
        if effects.validate {
            self.validate(ValidateOptions::of(ValidationType::Change))
                .await?;
        }
        Ok(())
    }

    /// Focus the registered handle and mark the field touched.
    pub async fn focus(&self) -> FormResult<()> {
        if let Some(handle) = self.handle() {
            handle.focus();
        }
        self.interact(MetaPatch::default().touched(true), ValidationType::Focus)
            .await
    }

    /// Blur the registered handle and mark the field blurred and touched.
    pub async fn blur(&self) -> FormResult<()> {
        if let Some(handle) = self.handle() {
            handle.blur();
        }
        self.interact(
            MetaPatch::default().touched(true).blurred(true),
            ValidationType::Blur,
        )
        .await
    }

    async fn interact(&self, patch: MetaPatch, kind: ValidationType) -> FormResult<()> {
        self.form
            .commit(|state| state.records.set(&self.path, RecordPatch::meta(patch)));
        if self.form.effects(Should::new()).validate {
            self.validate(ValidateOptions::of(kind)).await?;
        }
        Ok(())
    }

    fn handle(&self) -> Option<Arc<dyn FieldHandle>> {
        let snapshot = self.form.snapshot();
        snapshot
            .records
            .get(&self.path)
            .and_then(|r| r.handle.as_ref())
            .and_then(HandleRef::upgrade)
    }

    /// Restore the default value and rebuild the records of this subtree.
    ///
    /// An explicit `value` also becomes the default at this path.
    pub fn reset(&self, options: FieldResetOptions) -> FormResult<()> {
        let FieldResetOptions { value, meta, keep } = options;
        self.form.try_commit(|state| {
            let value = match value {
                Some(value) => {
                    state.defaults =
                        Arc::new(tree::write(&state.defaults, &self.path, value.clone())?);
                    value
                }
                None => tree::read(&state.defaults, &self.path)
                    .cloned()
                    .unwrap_or(Value::Null),
            };
            let next = tree::write(&state.values, &self.path, value)?;
            let previous = std::mem::replace(&mut state.values, Arc::new(next));
            state
                .records
                .reset_keeping(&self.path, &state.values, keep);
            state.records.adjust(&state.values);
            if keep.errors {
                state.prune_vanished_errors(&previous, &self.path);
            } else {
                let path = &self.path;
                state.clear_errors(|p| path.is_prefix_of(p));
            }
            if let Some(meta) = meta {
                state.records.set(&self.path, RecordPatch::meta(meta));
            }
            Ok(())
        })?;
        debug!(path = %self.path, ?keep, "field reset");
        Ok(())
    }

    /// Set this field's issues directly, bypassing validators.
    pub fn set_errors(&self, issues: Vec<Issue>, mode: ErrorMode) {
        self.form.commit(|state| set_errors(state, &self.path, issues, mode));
    }

    /// Validate the whole tree, replacing errors only for this field's
    /// subtree and its related fields.
    pub fn validate(&self, options: ValidateOptions) -> BoxFuture<'static, FormResult<Vec<Issue>>> {
        self.form.validate(Some(vec![self.path.clone()]), options)
    }

    /// Store (or clear, with `None`) the external handle for this path.
    ///
    /// Only a weak reference is kept; the caller owns the handle.
    pub fn register(&self, handle: Option<&Arc<dyn FieldHandle>>) {
        let handle = handle.map(HandleRef::new);
        self.form
            .commit(|state| state.records.set(&self.path, RecordPatch::handle(handle)));
    }
}

fn set_errors(state: &mut FormState, path: &Path, issues: Vec<Issue>, mode: ErrorMode) {
    let current = state.errors_at(path);
    let next = match mode {
        ErrorMode::Replace => issues,
        ErrorMode::Append => current.iter().cloned().chain(issues).collect(),
        ErrorMode::Keep if current.is_empty() => issues,
        ErrorMode::Keep => return,
    };
    if next.is_empty() {
        state.errors.remove(path);
    } else {
        state.errors.insert(path.clone(), next.clone());
    }
    state.records.set(path, RecordPatch::errors(next));
}
