//! Path-addressed reactive form state.
//!
//! `tirea-form` tracks a JSON value tree together with one record per
//! addressable path (stable id, touched/dirty/blurred flags, issues and an
//! optional external handle), keeps those records attached to their items
//! when arrays are spliced, and runs schema validators whose issues are
//! bucketed back onto the paths that produced them.
//!
//! # Core Concepts
//!
//! - **Path**: parsed field address (`"users.2.email"` -> `users`, `2`, `email`)
//! - **FieldStore**: flat map from path to [`FieldRecord`]
//! - **ArrayEdit**: a structural array edit applied to values, records and errors alike
//! - **Validator**: async schema check over the whole tree
//! - **FormView**: derived, read-only projection published to subscribers
//! - **Form**: the engine; every mutation is a copy-on-write commit
//!
//! # Quick Start
//!
//! ```
//! use tirea_form::{Form, Should};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let form = Form::new(json!({"tags": ["x", "y"]}));
//!
//! form.array("tags").append(json!("z"), Should::new()).await.unwrap();
//! assert_eq!(form.values()["tags"], json!(["x", "y", "z"]));
//! assert!(form.meta("tags").dirty);
//!
//! form.array("tags").remove(0).unwrap();
//! assert_eq!(form.values()["tags"], json!(["y", "z"]));
//! # }
//! ```

mod error;
mod form;
mod issue;
mod options;
mod path;
mod record;
mod reindex;
mod store;
pub mod tree;
mod validation;
mod view;

// Core types
pub use error::{value_type_name, FormError, FormResult, ValidatorError};
pub use issue::{bucket_issues, Issue, ValidationOutcome};
pub use path::{Path, Seg};
pub use record::{FieldHandle, FieldId, FieldMeta, FieldRecord, HandleRef, MetaPatch, RecordPatch};
pub use reindex::{clamp_existing, clamp_insert, remap_entries, ArrayEdit};
pub use store::FieldStore;

// Engine
pub use form::{ArrayField, Field, Form, FormBuilder, FormState};
pub use options::{
    Effects, ErrorMode, FieldResetOptions, FormConfig, FormResetOptions, Keep, Should,
    ShouldDefaults, ValidateOptions,
};
pub use validation::{
    filter_issues, merge_errors, validator_fn, AffectedPaths, FnValidator, RelatedPaths,
    ValidationType, Validator, ValidatorSource, Validators,
};
pub use view::{FieldView, FormStatus, FormView, StatusView};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
