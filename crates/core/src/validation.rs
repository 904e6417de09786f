//! Shared input validation helpers.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{3,50}$").expect("valid regex"));

pub fn validate_email(email: &str) -> Result<(), String> {
    if !EMAIL_RE.is_match(email) {
        return Err(format!("Invalid email address '{email}'"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Username must be 3-50 characters of letters, digits, '.', '_' or '-'".to_string(),
        );
    }
    Ok(())
}

/// Reject empty or whitespace-only required text.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

/// Clamp a client-supplied page size.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email("office@lgu.gov.ph").is_ok());
        assert!(validate_email("a.b+c@x.io").is_ok());
        assert!(validate_email("nobody").is_err());
        assert!(validate_email("x@y").is_err());
    }

    #[test]
    fn usernames() {
        assert!(validate_username("iu.engineering").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn required_text() {
        assert!(require_non_empty("title", "Bridge").is_ok());
        assert_eq!(require_non_empty("title", "  ").unwrap_err(), "title is required");
    }

    #[test]
    fn limits() {
        assert_eq!(clamp_limit(None, 50, 100), 50);
        assert_eq!(clamp_limit(Some(500), 50, 100), 100);
        assert_eq!(clamp_limit(Some(0), 50, 100), 1);
        assert_eq!(clamp_offset(Some(-5)), 0);
        assert_eq!(clamp_offset(Some(20)), 20);
    }
}
