//! Field checks shared by every procedure input.
//!
//! Each check returns the first problem it finds; inputs collect them in a
//! [`ValidationResult`] so the client sees every failing field at once.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{0}' is required")]
    Required(String),
    #[error("Field '{field}' is too short: {actual} < {min} chars")]
    TooShort { field: String, min: usize, actual: usize },
    #[error("Field '{field}' is too long: {actual} > {max} chars")]
    TooLong { field: String, max: usize, actual: usize },
    #[error("Field '{field}' has invalid format, expected: {expected}")]
    InvalidFormat { field: String, expected: String },
    #[error("Field '{field}' must be between {min} and {max}")]
    InvalidRange { field: String, min: String, max: String },
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Records the error of a single check, if any.
    pub fn check(&mut self, outcome: Result<(), ValidationError>) {
        if let Err(e) = outcome {
            self.errors.push(e);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn to_error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// `Err(self)` converts into a 400 with one entry per failing field.
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Implemented by every procedure input that carries field constraints.
pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

const EMAIL_MAX: usize = 254;
const URL_MAX: usize = 2048;
/// Width of the stored `phone` columns.
pub const PHONE_MAX: usize = 32;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern")
});

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9][-A-Za-z0-9]*(?:\.[A-Za-z0-9][-A-Za-z0-9]*)*(?::\d{1,5})?(?:/[^\s]*)?$")
        .expect("url pattern")
});

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{6,14}$").expect("phone pattern"));

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{2,31}$").expect("username pattern"));

pub fn validate_required(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field_name.to_string()))
    } else {
        Ok(())
    }
}

/// Length bounds are measured in characters, not bytes.
pub fn validate_length(
    value: &str,
    field_name: &str,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    let actual = value.trim().chars().count();
    let field = field_name.to_string();
    match (min, max) {
        (Some(min), _) if actual < min => Err(ValidationError::TooShort { field, min, actual }),
        (_, Some(max)) if actual > max => Err(ValidationError::TooLong { field, max, actual }),
        _ => Ok(()),
    }
}

pub fn validate_optional_length(
    value: Option<&str>,
    field_name: &str,
    max: usize,
) -> Result<(), ValidationError> {
    value.map_or(Ok(()), |v| validate_length(v, field_name, None, Some(max)))
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.len() <= EMAIL_MAX && EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Only absolute http(s) links are accepted for profile and social fields.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.len() <= URL_MAX && URL_PATTERN.is_match(url) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl(url.to_string()))
    }
}

/// Spaces, dots, dashes and brackets are allowed as separators; what
/// remains must be E.164-like. Anything else is rejected, never stripped.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidPhone(phone.to_string());
    if phone.chars().count() > PHONE_MAX
        || !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '(' | ')' | '-' | '.'))
    {
        return Err(invalid());
    }
    let compact: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if PHONE_PATTERN.is_match(&compact) {
        Ok(())
    } else {
        Err(invalid())
    }
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if USERNAME_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            expected: "3-32 chars, starting with a letter; letters, digits, _ or -".to_string(),
        })
    }
}

pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    field_name: &str,
    min: T,
    max: T,
) -> Result<(), ValidationError> {
    if min <= value && value <= max {
        return Ok(());
    }
    Err(ValidationError::InvalidRange {
        field: field_name.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    })
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    validate_length(password, "password", Some(8), Some(128))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@zelene.dev").is_ok());
        assert!(validate_email("ana.b+tag@mail.example.org").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn test_validate_length_counts_chars() {
        assert!(validate_length("čćžšđ", "name", Some(5), Some(5)).is_ok());
        assert!(matches!(
            validate_length("short", "message", Some(10), None),
            Err(ValidationError::TooShort { min: 10, actual: 5, .. })
        ));
        assert!(validate_length("x".repeat(11).as_str(), "code", None, Some(10)).is_err());
    }

    #[test]
    fn test_validate_range_inclusive() {
        assert!(validate_range(0, "satisfaction", 0, 5).is_ok());
        assert!(validate_range(5, "satisfaction", 0, 5).is_ok());
        assert!(validate_range(-1, "satisfaction", 0, 5).is_err());
        assert!(validate_range(6, "satisfaction", 0, 5).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("marta_k").is_ok());
        assert!(validate_username("1marta").is_err());
        assert!(validate_username("ab").is_err());
    }

    #[test]
    fn test_validation_result_collects() {
        let mut result = ValidationResult::new();
        result.check(validate_required("", "name"));
        result.check(validate_email("x@y.io"));
        result.check(validate_phone("12"));
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 2);
        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_validate_phone_separators_and_junk() {
        assert!(validate_phone("+385 (1) 234-5678").is_ok());
        assert!(validate_phone("385.1.234.5678").is_ok());
        assert!(validate_phone("1234567 please call me after five pm thanks").is_err());
        assert!(validate_phone("ext. 1234567").is_err());
        assert!(validate_phone(&format!("+{}", "1 ".repeat(16))).is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://zelene.dev/help").is_ok());
        assert!(validate_url("http://localhost:3000/issues").is_ok());
        assert!(validate_url("javascript:alert(1)").is_err());
    }
}
