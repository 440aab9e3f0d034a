use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lower-cases a user identifier, rejecting anything that is not
/// an email address. `field` names the offending request field.
pub fn normalize_email(raw: Option<&str>, field: &str) -> Result<String, AppError> {
    let email = raw.map(|e| e.trim().to_lowercase()).unwrap_or_default();
    if email.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation(format!("{field} must be an email address")));
    }
    Ok(email)
}
