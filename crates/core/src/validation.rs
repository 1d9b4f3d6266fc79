//! Request validation results and field-path normalization.
//!
//! The request-binding layer addresses nested fields with brackets
//! (`user[country][id]`). API consumers only ever see dot paths
//! (`user.country.id`), so every error map is normalized before it is
//! rendered.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Key under which errors that do not belong to a single field are stored.
pub const GLOBAL_KEY: &str = "global";

/// Message code for a missing required field.
pub const REQUIRED: &str = "validation.required";

static BRACKET_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.+?)\]").expect("static regex"));

/// A single validation failure attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Field path the error belongs to.
    pub key: String,
    /// Machine-readable message code (e.g. `validation.required`).
    pub message: String,
}

impl ValidationError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Field path → ordered list of failures.
pub type ErrorMap = BTreeMap<String, Vec<ValidationError>>;

/// Per-request collector of validation failures.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    errors: ErrorMap,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a `validation.required` error when `value` is absent or blank.
    ///
    /// Returns `true` when the value is present.
    pub fn required(&mut self, field: &str, value: Option<&str>) -> bool {
        match value {
            Some(v) if !v.trim().is_empty() => true,
            _ => {
                self.add_error(field, REQUIRED);
                false
            }
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(ValidationError::new(field, message));
    }

    pub fn add_global_error(&mut self, message: &str) {
        self.add_error(GLOBAL_KEY, message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors_map(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }
}

/// Normalize a bracket-indexed field path into a dot path.
///
/// `user[country][id]` becomes `user.country.id`. Empty brackets are left
/// untouched.
pub fn normalize_field(field: &str) -> String {
    BRACKET_SEGMENT.replace_all(field, ".$1").into_owned()
}

/// Normalize every key (and every error's own key) of an error map.
///
/// Keys that collapse onto the same dot path are merged, keeping
/// the order errors were added in.
pub fn normalize_error_map(errors: &ErrorMap) -> ErrorMap {
    let mut out = ErrorMap::new();
    for (field, list) in errors {
        let label = normalize_field(field);
        let slot = out.entry(label.clone()).or_default();
        slot.extend(list.iter().map(|e| ValidationError::new(label.clone(), e.message.clone())));
    }
    out
}
