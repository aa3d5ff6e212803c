use std::sync::OnceLock;

use regex::Regex;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Emails and usernames are compared case-insensitively, so they are stored
/// trimmed and lower-cased.
pub fn normalize_identity(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn require_non_empty(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn email(raw: &str) -> Result<String, ApiError> {
    let email = normalize_identity(raw);
    if !is_valid_email(&email) {
        return Err(ApiError::validation("A valid email is required"));
    }
    Ok(email)
}

pub fn username(raw: &str) -> Result<String, ApiError> {
    let username = normalize_identity(raw);
    if username.is_empty() {
        return Err(ApiError::validation("username is required"));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::validation("username must not contain spaces"));
    }
    Ok(username)
}

pub fn password(raw: &str) -> Result<(), ApiError> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
