//! Error types for subtrack

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid import format: {0}")]
    Format(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Auth,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Caller-facing classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Field-level, user-fixable input problem
    Validation,
    /// Import document shape not recognized
    Format,
    /// Record missing or owned by someone else
    NotFound,
    /// No authenticated identity
    Auth,
    /// Underlying store failure
    Persistence,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Format(_) => ErrorKind::Format,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Auth => ErrorKind::Auth,
            Self::Persistence(_)
            | Self::Database(_)
            | Self::Pool(_)
            | Self::Encryption(_)
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Persistence,
        }
    }

    pub fn not_found(id: &str) -> Self {
        Self::NotFound(format!("Subscription {} not found", id))
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Field-keyed validation failures
///
/// Keys are field names as they appear in the API (`title`, `price`,
/// `charges[1].dayOfMonth`); iteration is in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`; the first message for a field wins
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_joins_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "Title is required");
        errors.add("price", "Price must be a positive number");

        // BTreeMap ordering: price before title
        assert_eq!(
            errors.to_string(),
            "price: Price must be a positive number; title: Title is required"
        );
    }

    #[test]
    fn test_first_message_per_field_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("url", "first");
        errors.add("url", "second");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("url"), Some("first"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::Auth.kind(), ErrorKind::Auth);
        assert_eq!(Error::not_found("abc").kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::Format("bad".to_string()).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            Error::Encryption("x".to_string()).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            Error::from(ValidationErrors::new()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_validation_errors_serialize_as_map() {
        let mut errors = ValidationErrors::new();
        errors.add("currency", "Currency is required");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["currency"], "Currency is required");
    }
}
