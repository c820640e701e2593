//! Field validators shared by the services.

use url::Url;

use crate::error::{DomainError, FieldError};

pub const TITLE_MAX: usize = 200;
pub const NAME_MAX: usize = 100;
pub const USERNAME_MAX: usize = 10;
pub const EMAIL_MAX: usize = 255;
pub const COUNTRY_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;

/// Accumulates field errors so a response can report all of them at once.
#[derive(Debug, Default)]
pub struct Errors(Vec<FieldError>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error, if any, and yields the value otherwise.
    pub fn check<T>(&mut self, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.0.push(e);
                None
            }
        }
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.0))
        }
    }
}

/// Trimmed, non-blank text no longer than `max` characters.
pub fn text(field: &str, value: &str, max: Option<usize>) -> Result<String, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(field, "This field may not be blank."));
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(FieldError::new(
                field,
                format!("Ensure this field has no more than {max} characters."),
            ));
        }
    }
    Ok(value.to_string())
}

/// Like [`text`] but fails with "required" when the value is missing.
pub fn required_text(
    field: &str,
    value: Option<&str>,
    max: Option<usize>,
) -> Result<String, FieldError> {
    match value {
        Some(v) => text(field, v, max),
        None => Err(FieldError::required(field)),
    }
}

pub fn email(value: &str) -> Result<String, FieldError> {
    let value = text("email", value, Some(EMAIL_MAX))?;
    let valid = match value.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(value)
    } else {
        Err(FieldError::new("email", "Enter a valid email address."))
    }
}

pub fn password(value: &str) -> Result<(), FieldError> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(FieldError::new(
            "password",
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN} characters."
            ),
        ));
    }
    Ok(())
}

/// Absolute http(s) URL.
pub fn http_url(field: &str, value: &str) -> Result<String, FieldError> {
    let value = value.trim();
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(value.to_string())
        }
        _ => Err(FieldError::new(field, "Enter a valid URL.")),
    }
}
