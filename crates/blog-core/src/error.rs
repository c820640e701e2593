//! Domain-level error types.

use std::fmt;

use thiserror::Error;

use crate::ports::AuthError;

/// A validation failure attached to a single input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Error for a foreign identifier that does not resolve to a stored record.
    pub fn unknown_pk(field: impl Into<String>, id: i32) -> Self {
        Self::new(field, format!("Invalid pk \"{id}\" - object does not exist."))
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "This field is required.")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: i32 },

    #[error("{0}")]
    NotFoundMessage(String),

    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl DomainError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pk_names_the_identifier() {
        let err = FieldError::unknown_pk("tag_ids", 42);
        assert_eq!(err.field, "tag_ids");
        assert_eq!(err.message, "Invalid pk \"42\" - object does not exist.");
    }

    #[test]
    fn validation_display_lists_every_field() {
        let err = DomainError::Validation(vec![
            FieldError::required("title"),
            FieldError::new("content", "This field may not be blank."),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: title: This field is required., content: This field may not be blank."
        );
    }
}
