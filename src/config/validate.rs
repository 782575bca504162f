//! Field-level validators.
//!
//! Each validator records violations into the shared error list and returns
//! the value only when it passed, so the caller can keep checking the
//! remaining fields.

use crate::registry;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// One offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Request field name as it appears on the wire (camelCase)
    pub field: String,
    /// What was wrong with it
    pub reason: String,
}

impl FieldError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Android package name: 2+ segments of `[a-zA-Z][a-zA-Z0-9_]*` joined by dots.
static PACKAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*(\.[a-zA-Z][a-zA-Z0-9_]*)+$")
        .unwrap_or_else(|e| panic!("package name regex: {e}"))
});

/// 6-digit hex color with leading `#`.
static HEX_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap_or_else(|e| panic!("hex color regex: {e}"))
});

pub(super) fn required(
    field: &str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        Some(v) => Some(v),
        None => {
            errors.push(FieldError::new(field, "required field is missing"));
            None
        }
    }
}

pub(super) fn non_empty(
    field: &str,
    value: String,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
        None
    } else {
        Some(value)
    }
}

pub(super) fn package_name(
    field: &str,
    value: String,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    if PACKAGE_NAME_RE.is_match(&value) {
        Some(value)
    } else {
        errors.push(FieldError::new(
            field,
            format!(
                "{value:?} is not a valid package name \
                 (expected reverse-domain form like com.example.myapp)"
            ),
        ));
        None
    }
}

pub(super) fn launch_url(
    field: &str,
    value: String,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(value),
        Ok(url) => {
            errors.push(FieldError::new(
                field,
                format!("scheme {:?} is not allowed (use http or https)", url.scheme()),
            ));
            None
        }
        Err(e) => {
            errors.push(FieldError::new(field, format!("not an absolute URL: {e}")));
            None
        }
    }
}

/// Hex-color field with a registry default.
///
/// An absent value takes the default; a present-but-invalid value is an
/// error, never the default.
pub(super) fn hex_color(
    field: &str,
    value: Option<String>,
    default: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None => Some(default.to_string()),
        Some(v) if HEX_COLOR_RE.is_match(&v) => Some(v),
        Some(v) => {
            errors.push(FieldError::new(
                field,
                format!("{v:?} is not a 6-digit hex color with leading '#'"),
            ));
            None
        }
    }
}

pub(super) fn icon_choice(
    field: &str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None => Some(registry::DEFAULT_ICON.to_string()),
        Some(v) if registry::icon(&v).is_some() => Some(v),
        Some(v) => {
            errors.push(FieldError::new(
                field,
                format!(
                    "unknown icon {v:?} (available: {})",
                    registry::icon_keys().join(", ")
                ),
            ));
            None
        }
    }
}
