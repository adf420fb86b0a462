use thiserror::Error;

/// A form-level problem caught before any network call, tied to the offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::new("email", "Email is required"));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::new(
            "email",
            "Please enter a valid email address",
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new("password", "Password is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(validate_email("buyer@acme.test").is_ok());
        assert_eq!(validate_email("").unwrap_err().message, "Email is required");
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@acme.test").is_err());
        assert!(validate_email("buyer@localhost").is_err());
        assert!(validate_email("bu yer@acme.test").is_err());
    }

    #[test]
    fn password_must_be_present() {
        assert_eq!(validate_password("").unwrap_err().field, "password");
        assert!(validate_password("x").is_ok());
    }
}
