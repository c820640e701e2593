//! Standardized API response types (RFC 7807 compliant for errors).

use std::collections::BTreeMap;

use blog_core::FieldError;
use blog_core::domain::Page;
use serde::{Deserialize, Serialize};

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Size of the whole filtered result set.
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<T>,
}

impl<T, U: From<T>> From<Page<T>> for PageResponse<U> {
    fn from(page: Page<T>) -> Self {
        Self {
            count: page.total,
            page: page.page,
            page_size: page.page_size,
            results: page.items.into_iter().map(U::from).collect(),
        }
    }
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// See: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Field-level validation messages, keyed by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ErrorResponse {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            error_type: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: None,
            errors: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_field_errors<'a>(mut self, errors: impl IntoIterator<Item = &'a FieldError>) -> Self {
        for error in errors {
            self.errors
                .entry(error.field.clone())
                .or_default()
                .push(error.message.clone());
        }
        self
    }

    // Common error constructors
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, "Bad Request").with_detail(detail)
    }

    pub fn validation(errors: &[FieldError]) -> Self {
        Self::new(400, "Validation Failed")
            .with_detail("One or more fields are invalid.")
            .with_field_errors(errors)
    }

    pub fn unauthorized() -> Self {
        Self::new(401, "Unauthorized")
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(403, "Forbidden").with_detail(detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, "Not Found").with_detail(detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(409, "Conflict").with_detail(detail)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_groups_messages_by_field() {
        let errors = vec![
            FieldError::unknown_pk("tag_ids", 4),
            FieldError::unknown_pk("tag_ids", 5),
            FieldError::required("title"),
        ];
        let body = serde_json::to_value(ErrorResponse::validation(&errors)).unwrap();

        assert_eq!(body["status"], 400);
        assert_eq!(body["errors"]["tag_ids"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"]["title"][0], "This field is required.");
    }

    #[test]
    fn empty_errors_are_omitted() {
        let body = serde_json::to_value(ErrorResponse::not_found("gone")).unwrap();
        assert!(body.get("errors").is_none());
        assert_eq!(body["type"], "about:blank");
        assert_eq!(body["detail"], "gone");
    }
}
