//! Input rules for user-submitted credentials
//!
//! Pure checks, no I/O. Callers turn a failure into a field error and stop
//! before any backend call is made.

use crate::model::{FieldError, RegisterUserRequest};

/// Minimum password length in UTF-8 bytes.
///
/// Placeholder until a real strength policy exists.
pub const MIN_PASSWORD_LENGTH: usize = 3;

/// Outcome of a single rule: `Err` carries the human-readable reason
pub type Verdict = Result<(), String>;

/// Usernames may not look like email addresses
pub fn validate_username(username: &str) -> Verdict {
    if username.contains('@') {
        return Err("username must not contain '@'".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Verdict {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "password must be at least {} bytes",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

/// Exactly one `@` between two non-empty parts, and a `.` in the domain
pub fn validate_email(email: &str) -> Verdict {
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err("email must contain exactly one '@'".to_string()),
    };
    if local.is_empty() || domain.is_empty() {
        return Err("email must have text on both sides of '@'".to_string());
    }
    if !domain.contains('.') {
        return Err("email domain must contain '.'".to_string());
    }
    Ok(())
}

/// Check a registration in field order (username, password, email).
///
/// Only the first violation is reported.
pub fn validate_registration(input: &RegisterUserRequest) -> Result<(), FieldError> {
    validate_username(&input.username).map_err(|m| FieldError::new("username", m))?;
    validate_password(&input.password).map_err(|m| FieldError::new("password", m))?;
    validate_email(&input.email).map_err(|m| FieldError::new("email", m))?;
    Ok(())
}

/// Which credential column a login identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKey {
    Username,
    Email,
}

/// Anything that passes the email rule is treated as an email address
pub fn classify_login_identifier(username_or_email: &str) -> CredentialKey {
    if validate_email(username_or_email).is_ok() {
        CredentialKey::Email
    } else {
        CredentialKey::Username
    }
}
