// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Form input validation.
//!
//! Inputs are checked, never rewritten: identifiers keep their case and
//! surrounding whitespace exactly as submitted.

use secrets_common::CredentialForm;
use thiserror::Error;

use crate::error::AppError;

const MAX_IDENTIFIER_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_SECRET_LENGTH: usize = 1024;

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid password: {0}")]
    InvalidSecret(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Validate an account identifier
pub fn validate_identifier(identifier: &str) -> ValidationResult<&str> {
    if identifier.is_empty() {
        return Err(ValidationError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }

    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::InvalidIdentifier(format!(
            "identifier cannot exceed {MAX_IDENTIFIER_LENGTH} bytes"
        )));
    }

    if identifier.chars().any(char::is_control) {
        return Err(ValidationError::InvalidIdentifier(
            "identifier cannot contain control characters".to_string(),
        ));
    }

    Ok(identifier)
}

/// Validate a raw secret
pub fn validate_secret(secret: &str) -> ValidationResult<&str> {
    if secret.is_empty() {
        return Err(ValidationError::InvalidSecret(
            "password cannot be empty".to_string(),
        ));
    }

    // Bounds the work done by the hashing codec
    if secret.len() > MAX_SECRET_LENGTH {
        return Err(ValidationError::InvalidSecret(format!(
            "password cannot exceed {MAX_SECRET_LENGTH} bytes"
        )));
    }

    Ok(secret)
}

/// Validate both halves of a submitted form
pub fn validate_form(form: &CredentialForm) -> ValidationResult<()> {
    validate_identifier(&form.username)?;
    validate_secret(&form.password)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("alice@example.com").is_ok());
        assert_eq!(
            validate_identifier(" Alice@Example.com ").unwrap(),
            " Alice@Example.com "
        );

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("alice\n@example.com").is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_secret() {
        assert!(validate_secret("correct-horse").is_ok());
        assert!(validate_secret(" ").is_ok());

        assert!(validate_secret("").is_err());
        assert!(validate_secret(&"x".repeat(MAX_SECRET_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_form() {
        let form = CredentialForm {
            username: "alice@example.com".to_string(),
            password: String::new(),
        };
        assert!(matches!(
            validate_form(&form),
            Err(ValidationError::InvalidSecret(_))
        ));
    }
}
