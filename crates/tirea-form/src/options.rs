//! Option types accepted by mutators, plus the form configuration.

use crate::record::MetaPatch;
use crate::validation::ValidationType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Side effects a mutator should perform.
///
/// Unset flags fall back to the form's configured defaults (all `true`
/// unless [`FormConfig::should`] says otherwise).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Should {
    pub validate: Option<bool>,
    pub dirty: Option<bool>,
    pub touch: Option<bool>,
}

impl Should {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(mut self, value: bool) -> Self {
        self.validate = Some(value);
        self
    }

    pub fn dirty(mut self, value: bool) -> Self {
        self.dirty = Some(value);
        self
    }

    pub fn touch(mut self, value: bool) -> Self {
        self.touch = Some(value);
        self
    }

    /// Skip validation, dirtying and touching.
    pub fn nothing() -> Self {
        Self {
            validate: Some(false),
            dirty: Some(false),
            touch: Some(false),
        }
    }

    pub fn resolve(&self, defaults: &ShouldDefaults) -> Effects {
        Effects {
            validate: self.validate.unwrap_or(defaults.validate),
            dirty: self.dirty.unwrap_or(defaults.dirty),
            touch: self.touch.unwrap_or(defaults.touch),
        }
    }
}

/// Fallback values for [`Should`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShouldDefaults {
    pub validate: bool,
    pub dirty: bool,
    pub touch: bool,
}

impl Default for ShouldDefaults {
    fn default() -> Self {
        Self {
            validate: true,
            dirty: true,
            touch: true,
        }
    }
}

/// [`Should`] after defaults are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Effects {
    pub validate: bool,
    pub dirty: bool,
    pub touch: bool,
}

impl Effects {
    /// Meta patch marking the flags this call asks for.
    pub fn meta_patch(&self) -> MetaPatch {
        MetaPatch {
            touched: self.touch.then_some(true),
            dirty: self.dirty.then_some(true),
            blurred: None,
        }
    }
}

/// Which parts of existing records survive a reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keep {
    pub meta: bool,
    pub errors: bool,
    pub refs: bool,
}

/// Options for resetting one field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldResetOptions {
    /// New value; also becomes the field's default. `None` restores the
    /// current default.
    pub value: Option<Value>,
    /// Meta applied after the reset.
    pub meta: Option<MetaPatch>,
    pub keep: Keep,
}

/// Options for resetting the whole form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormResetOptions {
    /// New value tree. `None` restores the defaults.
    pub values: Option<Value>,
    pub keep: Keep,
    /// Keep the current defaults even when `values` is given.
    pub keep_defaults: bool,
}

/// How [`Field::set_errors`](crate::Field::set_errors) combines new issues
/// with existing ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    #[default]
    Replace,
    Append,
    /// Only set the issues if the field currently has none.
    Keep,
}

/// Options for a validation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Validator selection; `None` runs the base schema.
    pub kind: Option<ValidationType>,
}

impl ValidateOptions {
    pub fn of(kind: ValidationType) -> Self {
        Self { kind: Some(kind) }
    }
}

/// Serializable form configuration.
///
/// ```
/// use tirea_form::FormConfig;
///
/// let config: FormConfig = serde_json::from_str(
///     r#"{"should": {"validate": false}, "related": {"password": ["confirm"]}}"#,
/// )
/// .unwrap();
/// assert!(!config.should.validate);
/// assert!(config.should.dirty);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub should: ShouldDefaults,
    /// Dotted field name -> dotted names validated alongside it.
    pub related: BTreeMap<String, Vec<String>>,
}
