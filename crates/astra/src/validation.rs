//! Schema checks applied to every inbound payload before it reaches a service.

use crate::error::ValidationError;

/// Reject a payload on its first violation.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }
    limit_text(field, value, max_len)
}

pub(crate) fn limit_text(field: &str, value: &str, max_len: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn require_url(field: &str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.starts_with("https://") || value.starts_with("http://") {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must be an http(s) URL"))
    }
}
