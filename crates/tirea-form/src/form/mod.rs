//! The form engine: persisted state, mutation commits and validation runs.
//!
//! State is copy-on-write. Every mutation clones the current [`FormState`],
//! edits the clone and swaps it in, so a snapshot handed out earlier never
//! changes underneath its reader. After each commit (or at the end of a
//! [`Form::batch`]) the derived [`FormView`] is recomputed and published.

mod array;
mod field;

pub use array::ArrayField;
pub use field::Field;

use crate::error::FormResult;
use crate::options::{
    Effects, FormConfig, FormResetOptions, Should, ShouldDefaults, ValidateOptions,
};
use crate::validation::{
    filter_issues, merge_errors, AffectedPaths, RelatedPaths, ValidationType, Validator,
    ValidatorSource, Validators,
};
use crate::view::{FieldView, FormStatus, FormView, StatusView};
use crate::reindex::{remap_entries, ArrayEdit};
use crate::{tree, FieldStore, Issue, Path, RecordPatch};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// One immutable snapshot of everything the form persists.
#[derive(Clone, Debug, PartialEq)]
pub struct FormState {
    pub values: Arc<Value>,
    pub defaults: Arc<Value>,
    pub records: FieldStore,
    /// Persisted error buckets by path, including paths without a record.
    pub errors: BTreeMap<Path, Vec<Issue>>,
    pub status: FormStatus,
}

impl FormState {
    /// Fresh state whose values start out equal to `defaults`.
    pub fn new(defaults: Value) -> Self {
        let records = FieldStore::build(&defaults);
        let defaults = Arc::new(defaults);
        Self {
            values: defaults.clone(),
            defaults,
            records,
            errors: BTreeMap::new(),
            status: FormStatus::default(),
        }
    }

    /// Store `value` at `path` and reconcile the record key set.
    ///
    /// Error buckets of paths the write removed go away with their records.
    pub(crate) fn write_value(&mut self, path: &Path, value: Value) -> FormResult<()> {
        let next = tree::write(&self.values, path, value)?;
        let previous = std::mem::replace(&mut self.values, Arc::new(next));
        self.records.adjust(&self.values);
        self.prune_vanished_errors(&previous, path);
        Ok(())
    }

    /// Drop error buckets at or below `scope` whose path held a value in
    /// `previous` but no longer exists. Buckets for paths that never had a
    /// value (such as the root bucket or errors set ahead of a value) stay.
    pub(crate) fn prune_vanished_errors(&mut self, previous: &Value, scope: &Path) {
        let values = &self.values;
        let before = self.errors.len();
        self.errors.retain(|p, _| {
            !(scope.is_prefix_of(p)
                && tree::read(previous, p).is_some()
                && tree::read(values, p).is_none())
        });
        let pruned = before - self.errors.len();
        if pruned > 0 {
            trace!(scope = %scope, pruned, "dropped errors of vanished paths");
        }
    }

    /// Mark `path` and its ascendants per `effects`.
    pub(crate) fn mark(&mut self, path: &Path, effects: &Effects) {
        let patch = effects.meta_patch();
        if patch.is_empty() {
            return;
        }
        self.records.set(path, RecordPatch::meta(patch));
        if effects.dirty {
            self.status.dirty = true;
        }
    }

    /// Merge a validation run's issues into the error map and the records.
    pub(crate) fn apply_issues(&mut self, issues: &[Issue], affected: Option<&AffectedPaths>) {
        self.errors = merge_errors(&self.errors, issues, affected);
        match affected {
            Some(affected) => self.records.sync_errors(&self.errors, |p| affected.contains(p)),
            None => self.records.sync_errors(&self.errors, |_| true),
        }
    }

    /// Drop error buckets whose path satisfies `scope`.
    pub(crate) fn clear_errors(&mut self, scope: impl Fn(&Path) -> bool) {
        self.errors.retain(|p, _| !scope(p));
        self.records.sync_errors(&self.errors, scope);
    }

    /// Splice the array at `path` and move item records and error buckets
    /// along with their items. Returns `false` when the clamped edit is a
    /// no-op, in which case nothing changes.
    pub(crate) fn apply_array_edit(&mut self, path: &Path, edit: ArrayEdit) -> FormResult<bool> {
        let mut items = tree::array_at(&self.values, path)?;
        let Some(edit) = edit.clamped(items.len()) else {
            return Ok(false);
        };
        edit.apply_to(&mut items);
        self.values = Arc::new(tree::write(&self.values, path, Value::Array(items))?);
        self.records.remap(path, &edit);
        self.errors = remap_entries(&self.errors, path, &edit);
        if let ArrayEdit::Insert { index, .. } = edit {
            self.records.reset(&path.clone().index(index), &self.values);
        }
        self.records.adjust(&self.values);
        Ok(true)
    }

    pub fn errors_at(&self, path: &Path) -> &[Issue] {
        self.errors.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

struct FormInner {
    state: Mutex<Arc<FormState>>,
    validators: Validators,
    related: RelatedPaths,
    should: ShouldDefaults,
    view: watch::Sender<Arc<FormView>>,
    batch_depth: AtomicUsize,
}

/// Handle to a form instance. Clones share the same state.
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Form`].
///
/// ```
/// use tirea_form::{validator_fn, Form, ValidationOutcome};
/// use serde_json::json;
///
/// let form = Form::builder()
///     .defaults(json!({"name": ""}))
///     .schema(validator_fn(|v| Ok(ValidationOutcome::from_issues(v, vec![]))))
///     .related("password", ["confirm"])
///     .build();
/// assert_eq!(form.values()["name"], "");
/// ```
#[derive(Default)]
pub struct FormBuilder {
    defaults: Option<Value>,
    validators: Validators,
    related: RelatedPaths,
    should: ShouldDefaults,
}

impl FormBuilder {
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Base schema, used for untyped and submit validation.
    pub fn schema(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.schema = Some(ValidatorSource::Static(Arc::new(validator)));
        self
    }

    /// Validator for one interaction type.
    pub fn validator(mut self, kind: ValidationType, validator: impl Validator + 'static) -> Self {
        self.validators
            .by_type
            .insert(kind, ValidatorSource::Static(Arc::new(validator)));
        self
    }

    /// Validator chosen from the state at the time of each run.
    pub fn dynamic_validator<F>(mut self, kind: ValidationType, factory: F) -> Self
    where
        F: Fn(&FormState) -> Option<Arc<dyn Validator>> + Send + Sync + 'static,
    {
        self.validators
            .by_type
            .insert(kind, ValidatorSource::Dynamic(Arc::new(factory)));
        self
    }

    /// Declare fields validated together with `path`.
    pub fn related<I, P>(mut self, path: impl Into<Path>, related: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Path>,
    {
        self.related
            .insert(path.into(), related.into_iter().map(Into::into).collect());
        self
    }

    /// Apply a loaded configuration.
    pub fn config(mut self, config: &FormConfig) -> Self {
        self.should = config.should;
        for (path, related) in &config.related {
            self.related.insert(
                Path::parse(path),
                related.iter().map(|p| Path::parse(p)).collect(),
            );
        }
        self
    }

    pub fn build(self) -> Form {
        let defaults = self
            .defaults
            .unwrap_or_else(|| Value::Object(Default::default()));
        let state = FormState::new(defaults);
        let (view, _) = watch::channel(Arc::new(FormView::derive(&state)));
        Form {
            inner: Arc::new(FormInner {
                state: Mutex::new(Arc::new(state)),
                validators: self.validators,
                related: self.related,
                should: self.should,
                view,
                batch_depth: AtomicUsize::new(0),
            }),
        }
    }
}

struct BatchGuard<'a>(&'a Form);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if self.0.inner.batch_depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.publish();
        }
    }
}

impl Form {
    /// A form with the given default values and no validators.
    pub fn new(defaults: Value) -> Self {
        Self::builder().defaults(defaults).build()
    }

    pub fn builder() -> FormBuilder {
        FormBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, Arc<FormState>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The current persisted state.
    pub fn snapshot(&self) -> Arc<FormState> {
        self.lock().clone()
    }

    /// Apply `f` to a copy of the state and swap it in.
    pub(crate) fn commit<R>(&self, f: impl FnOnce(&mut FormState) -> R) -> R {
        let mut guard = self.lock();
        let mut next = FormState::clone(&guard);
        let out = f(&mut next);
        *guard = Arc::new(next);
        drop(guard);
        self.notify();
        out
    }

    /// Like [`commit`](Self::commit), but nothing is stored when `f` fails.
    pub(crate) fn try_commit<R>(
        &self,
        f: impl FnOnce(&mut FormState) -> FormResult<R>,
    ) -> FormResult<R> {
        let mut guard = self.lock();
        let mut next = FormState::clone(&guard);
        let out = f(&mut next)?;
        *guard = Arc::new(next);
        drop(guard);
        self.notify();
        Ok(out)
    }

    fn notify(&self) {
        if self.inner.batch_depth.load(Ordering::SeqCst) == 0 {
            self.publish();
        }
    }

    fn publish(&self) {
        let view = FormView::derive(&self.snapshot());
        let changed = self.inner.view.send_if_modified(|current| {
            if **current == view {
                false
            } else {
                *current = Arc::new(view);
                true
            }
        });
        trace!(changed, "form view published");
    }

    /// Run several mutations and publish a single view afterwards.
    pub fn batch<R>(&self, f: impl FnOnce(&Form) -> R) -> R {
        self.inner.batch_depth.fetch_add(1, Ordering::SeqCst);
        let _guard = BatchGuard(self);
        f(self)
    }

    pub(crate) fn effects(&self, should: Should) -> Effects {
        should.resolve(&self.inner.should)
    }

    /// Receive every published view.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FormView>> {
        self.inner.view.subscribe()
    }

    /// The last published view.
    pub fn view(&self) -> Arc<FormView> {
        self.inner.view.borrow().clone()
    }

    pub fn values(&self) -> Arc<Value> {
        self.snapshot().values.clone()
    }

    pub fn defaults(&self) -> Arc<Value> {
        self.snapshot().defaults.clone()
    }

    /// Deserialize the current values into `T`.
    pub fn values_as<T: DeserializeOwned>(&self) -> FormResult<T> {
        Ok(T::deserialize(&*self.values())?)
    }

    pub fn value(&self, path: impl Into<Path>) -> Option<Value> {
        tree::read(&self.snapshot().values, &path.into()).cloned()
    }

    pub fn status(&self) -> StatusView {
        StatusView::derive(&self.snapshot())
    }

    /// Computed meta for `path`; untracked paths read as fresh records.
    pub fn meta(&self, path: impl Into<Path>) -> FieldView {
        FieldView::derive(&self.snapshot(), &path.into())
    }

    pub fn errors(&self, path: impl Into<Path>) -> Vec<Issue> {
        self.snapshot().errors_at(&path.into()).to_vec()
    }

    /// All persisted error buckets.
    pub fn error_map(&self) -> BTreeMap<Path, Vec<Issue>> {
        self.snapshot().errors.clone()
    }

    pub fn field(&self, path: impl Into<Path>) -> Field<'_> {
        Field::new(self, path.into())
    }

    pub fn array(&self, path: impl Into<Path>) -> ArrayField<'_> {
        ArrayField::new(self, path.into())
    }

    /// Validate the whole tree and merge the resulting issues.
    ///
    /// `validating` is set before this returns, and cleared when the
    /// returned future settles (successfully or not). With `paths`, only
    /// those subtrees and their related fields have their errors replaced;
    /// without, the error map is overwritten. Resolves to the issues that
    /// were merged.
    pub fn validate(
        &self,
        paths: Option<Vec<Path>>,
        options: ValidateOptions,
    ) -> BoxFuture<'static, FormResult<Vec<Issue>>> {
        let snapshot = self.snapshot();
        let Some(validator) = self.inner.validators.resolve(options.kind, &snapshot) else {
            trace!(kind = ?options.kind, "no validator configured");
            return futures::future::ready(Ok(Vec::new())).boxed();
        };
        let affected = paths.map(|paths| self.inner.related.expand(&paths));
        let values = self.commit(|state| {
            state.status.validating = true;
            state.values.clone()
        });
        debug!(kind = ?options.kind, scope = ?affected.as_ref().map(|a| a.roots().len()), "validation started");

        let form = self.clone();
        async move {
            match validator.validate(&values).await {
                Ok(outcome) => {
                    let issues = filter_issues(outcome.into_issues(), affected.as_ref());
                    form.commit(|state| {
                        state.apply_issues(&issues, affected.as_ref());
                        state.status.validating = false;
                    });
                    debug!(issues = issues.len(), "validation finished");
                    Ok(issues)
                }
                Err(e) => {
                    warn!(error = %e, "validator failed");
                    form.commit(|state| state.status.validating = false);
                    Err(e.into())
                }
            }
        }
        .boxed()
    }

    /// Run submit validation, then hand the values or the issues to the
    /// matching callback. Resolves to whether the submission succeeded.
    pub async fn submit<S, SF, E, EF>(&self, on_success: S, on_error: E) -> FormResult<bool>
    where
        S: FnOnce(Arc<Value>) -> SF,
        SF: Future<Output = ()>,
        E: FnOnce(Vec<Issue>) -> EF,
        EF: Future<Output = ()>,
    {
        self.commit(|state| {
            state.status.submits += 1;
            state.status.submitting = true;
        });
        if let Err(e) = self
            .validate(None, ValidateOptions::of(ValidationType::Submit))
            .await
        {
            self.commit(|state| {
                state.status.submitting = false;
                state.status.successful = false;
            });
            return Err(e);
        }

        let snapshot = self.snapshot();
        let issues: Vec<Issue> = snapshot.errors.values().flatten().cloned().collect();
        let successful = issues.is_empty();
        if successful {
            on_success(snapshot.values.clone()).await;
        } else {
            on_error(issues).await;
        }
        self.commit(|state| {
            state.status.submitting = false;
            state.status.successful = successful;
        });
        debug!(successful, "submit finished");
        Ok(successful)
    }

    /// Reset the whole form.
    pub fn reset(&self, options: FormResetOptions) {
        let FormResetOptions {
            values,
            keep,
            keep_defaults,
        } = options;
        self.commit(|state| {
            let previous = match values {
                Some(values) => {
                    if !keep_defaults {
                        state.defaults = Arc::new(values.clone());
                    }
                    std::mem::replace(&mut state.values, Arc::new(values))
                }
                None => std::mem::replace(&mut state.values, state.defaults.clone()),
            };
            state
                .records
                .reset_keeping(&Path::root(), &state.values, keep);
            if keep.errors {
                state.prune_vanished_errors(&previous, &Path::root());
            } else {
                state.errors.clear();
            }
            state.status = FormStatus::default();
        });
        debug!(?keep, "form reset");
    }
}
