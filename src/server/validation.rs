//! Request validation utilities for the registry.
//!
//! Field limits follow the column sizes of the deployed `licenses` table.

use std::fmt;

use crate::errors::LicenseError;

/// Maximum length of a normalized identity (a dash-less UUID).
pub const MAX_IDENTITY_LEN: usize = 32;
/// Maximum length of a display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 16;
/// Maximum length of a hardware fingerprint (a hex SHA-256 digest).
pub const MAX_FINGERPRINT_LEN: usize = 64;

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for LicenseError {
    fn from(err: ValidationError) -> Self {
        LicenseError::InvalidRequest(format!("invalid field {err}"))
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate that a string has at most `max` characters.
///
/// # Example
/// ```
/// use argus::server::validation::validate_max_length;
///
/// assert!(validate_max_length("Alice", "username", 16).is_ok());
/// assert!(validate_max_length("AliceInWonderland", "username", 16).is_err());
/// ```
pub fn validate_max_length(value: &str, field_name: &str, max: usize) -> ValidationResult<()> {
    let len = value.chars().count();
    if len > max {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at most {max} characters (got {len})"),
        })
    } else {
        Ok(())
    }
}
