//! Input normalization and validation rules shared by the model types.
//!
//! # Invariants
//! - Names are trimmed before length checks and persistence.
//! - Control characters are rejected rather than silently stripped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length (in chars) of a candidate display name.
pub const CANDIDATE_NAME_MAX_CHARS: usize = 100;
/// Maximum length (in chars) of an event name.
pub const EVENT_NAME_MAX_CHARS: usize = 200;
/// Maximum length (in chars) of an event description.
pub const EVENT_DESCRIPTION_MAX_CHARS: usize = 2000;

static CONTROL_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Cc}]").expect("valid control char regex"));
static TENANT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").expect("valid tenant id regex"));

/// Malformed caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Named field is blank after trimming.
    Blank(&'static str),
    /// Named field exceeds its maximum length.
    TooLong { field: &'static str, max_chars: usize },
    /// Named field contains control characters.
    ControlCharacters(&'static str),
    /// Tenant identifier is not a lowercase slug.
    InvalidTenantId(String),
    /// Identifier text could not be parsed.
    InvalidId(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::ControlCharacters(field) => {
                write!(f, "{field} must not contain control characters")
            }
            Self::InvalidTenantId(value) => write!(
                f,
                "tenant id `{value}` must match [a-z0-9][a-z0-9_-]{{0,63}}"
            ),
            Self::InvalidId(value) => write!(f, "invalid identifier: `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Normalizes a required single-line name field.
pub fn normalize_name(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    if CONTROL_CHAR_RE.is_match(trimmed) {
        return Err(ValidationError::ControlCharacters(field));
    }
    Ok(trimmed.to_string())
}

/// Normalizes an optional free-text field. Blank input becomes `None`.
///
/// Newlines and tabs are allowed here; other control characters are not.
pub fn normalize_optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    if trimmed
        .chars()
        .any(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
    {
        return Err(ValidationError::ControlCharacters(field));
    }
    Ok(Some(trimmed.to_string()))
}

/// Returns whether the value is a well-formed tenant slug.
pub fn is_valid_tenant_id(value: &str) -> bool {
    TENANT_ID_RE.is_match(value)
}
