//! Input validation for API requests.
//!
//! Each function returns the first failing rule as a human-readable message;
//! handlers translate these into 400 responses.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::PRIORITIES;

lazy_static! {
    /// Regex for validating email addresses (no whitespace, one @, a dot in
    /// the domain part)
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MAX_TITLE_LENGTH: usize = 500;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_NAME_LENGTH: usize = 2;

/// Validate an email address format
pub fn validate_email(email: &str) -> Result<(), String> {
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate password requirements: minimum length, at least one uppercase
/// letter, one lowercase letter and one digit
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }
    Ok(())
}

/// Validate a display name (after trimming)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().chars().count() < MIN_NAME_LENGTH {
        return Err("Name must be at least 2 characters".to_string());
    }
    Ok(())
}

/// Validate a todo title (after trimming)
pub fn validate_title(title: &str) -> Result<(), String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title is required".to_string());
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err("Title cannot exceed 500 characters".to_string());
    }
    Ok(())
}

/// Validate a todo priority
pub fn validate_priority(priority: &str) -> Result<(), String> {
    if !PRIORITIES.contains(&priority) {
        return Err("Invalid priority. Use: low, medium or high".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@test.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@dot").is_err());
        assert!(validate_email("spaces in@test.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Test1234").is_ok());
        // Too short
        assert!(validate_password("Te1").is_err());
        // Missing uppercase
        assert!(validate_password("test1234").is_err());
        // Missing lowercase
        assert!(validate_password("TEST1234").is_err());
        // Missing digit
        assert!(validate_password("Testtest").is_err());
    }

    #[test]
    fn test_password_first_failing_rule_wins() {
        // Short and missing everything else: length message comes first
        let err = validate_password("x").unwrap_err();
        assert!(err.contains("at least 8 characters"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Al").is_ok());
        assert!(validate_name("  A  ").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Buy milk").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(500)).is_ok());
        assert!(validate_title(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_priority() {
        assert!(validate_priority("low").is_ok());
        assert!(validate_priority("medium").is_ok());
        assert!(validate_priority("high").is_ok());
        assert!(validate_priority("urgent").is_err());
        assert!(validate_priority("HIGH").is_err());
    }
}
