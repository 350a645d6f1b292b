//! Input validation for agents and rotation groups.

use std::fmt;

use crate::models::Strategy;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid phone number format.
    InvalidPhoneNumber(String),
    /// Weight outside `1..=MAX_WEIGHT`.
    InvalidWeight(i64),
    /// Invalid slug format.
    InvalidSlug(String),
    /// Unknown rotation strategy.
    InvalidStrategy(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidPhoneNumber(msg) => write!(f, "Invalid phone number: {}", msg),
            ValidationError::InvalidWeight(weight) => {
                write!(f, "Invalid weight {} (must be 1 to {})", weight, MAX_WEIGHT)
            }
            ValidationError::InvalidSlug(msg) => write!(f, "Invalid slug: {}", msg),
            ValidationError::InvalidStrategy(name) => write!(f, "Unknown strategy: {}", name),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Minimum number of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 7;

/// Maximum number of digits in a phone number (E.164).
pub const MAX_PHONE_DIGITS: usize = 15;

/// Maximum allowed length for slugs.
pub const MAX_SLUG_LENGTH: usize = 64;

/// Maximum allowed length for display names.
pub const MAX_NAME_LENGTH: usize = 128;

/// Largest rotation weight. Mirrored by the CHECK constraints on
/// `agents.weight` and `agent_groups.weight`.
pub const MAX_WEIGHT: i64 = 1000;

/// Normalize a phone number to its canonical digits-only form.
///
/// Accepts common formatting (spaces, dashes, dots, parentheses and a single
/// leading `+`) and rejects anything else. The result must have between
/// [`MIN_PHONE_DIGITS`] and [`MAX_PHONE_DIGITS`] digits.
pub fn normalize_phone_number(phone: &str) -> Result<String, ValidationError> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Empty("phone number".to_string()));
    }

    let body = phone.strip_prefix('+').unwrap_or(phone);
    let mut digits = String::with_capacity(body.len());

    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(ValidationError::InvalidPhoneNumber(format!(
                    "invalid character '{}'",
                    c
                )))
            }
        }
    }

    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ValidationError::InvalidPhoneNumber(format!(
            "too few digits ({}, min {})",
            digits.len(),
            MIN_PHONE_DIGITS
        )));
    }

    if digits.len() > MAX_PHONE_DIGITS {
        return Err(ValidationError::InvalidPhoneNumber(format!(
            "too many digits ({}, max {})",
            digits.len(),
            MAX_PHONE_DIGITS
        )));
    }

    Ok(digits)
}

/// Validate a rotation weight.
pub fn validate_weight(weight: i64) -> Result<(), ValidationError> {
    if !(1..=MAX_WEIGHT).contains(&weight) {
        return Err(ValidationError::InvalidWeight(weight));
    }
    Ok(())
}

/// Validate a display name.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("name".to_string()));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
            actual: name.len(),
        });
    }

    Ok(())
}

/// Validate a strategy name.
pub fn validate_strategy(strategy: &str) -> Result<(), ValidationError> {
    strategy.parse::<Strategy>().map(|_| ())
}

/// Derive a URL slug from a display name.
///
/// Lowercases ASCII letters, keeps digits, and collapses every other run of
/// characters into a single `-`. Leading and trailing dashes are dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_SLUG_LENGTH);
    slug.trim_end_matches('-').to_string()
}

/// Validate a slug.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Err(ValidationError::Empty("slug".to_string()));
    }

    if slug.len() > MAX_SLUG_LENGTH {
        return Err(ValidationError::TooLong {
            field: "slug".to_string(),
            max: MAX_SLUG_LENGTH,
            actual: slug.len(),
        });
    }

    if let Some(c) = slug
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(ValidationError::InvalidSlug(format!(
            "invalid character '{}'",
            c
        )));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ValidationError::InvalidSlug(
            "cannot start or end with a dash".to_string(),
        ));
    }

    Ok(())
}
