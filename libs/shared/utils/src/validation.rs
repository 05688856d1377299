use std::sync::LazyLock;

use regex::Regex;

use shared_models::error::AppError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

// Optional leading +, then digits with spaces or dashes between groups.
static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9]([0-9 \-]*[0-9])?$").expect("valid mobile regex")
});

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub fn validate_mobile(mobile: &str) -> bool {
    mobile.len() <= 15 && MOBILE_RE.is_match(mobile)
}

/// Trims `value` and fails with a validation error naming `field` when nothing is left.
pub fn require_non_empty(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
