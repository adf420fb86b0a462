use thiserror::Error;

use crate::api::{ApiError, ApiErrorKind};
use crate::domain::ValidationError;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Caught before any network call.
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Not signed in.")]
    NoSession,
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    Expired,
}

impl AuthError {
    /// Text for anything outside the login and registration forms. API failures keep the
    /// fixed status text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) => error.user_message().to_string(),
            other => other.to_string(),
        }
    }

    /// Text for the login/registration form.
    ///
    /// On the auth endpoints a 401 means bad credentials, not an expired session, and the
    /// backend's own explanation beats the generic table text for other failures.
    pub fn form_message(&self) -> String {
        match self {
            Self::Api(error) if error.kind == ApiErrorKind::Unauthorized => {
                INVALID_CREDENTIALS_MESSAGE.to_string()
            }
            Self::Api(error) if error.kind == ApiErrorKind::Server => error.message.clone(),
            Self::Api(error) => error
                .server_detail()
                .filter(|_| !error.is_retryable())
                .unwrap_or_else(|| error.message.clone()),
            other => other.to_string(),
        }
    }

    /// Form field to highlight, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(error) => Some(error.field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::messages;

    #[test]
    fn bad_credentials_read_as_such() {
        let error = AuthError::from(ApiError::from_status(401, br#"{"detail":"nope"}"#));
        assert_eq!(error.form_message(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[test]
    fn conflicts_use_the_backend_detail() {
        let error = AuthError::from(ApiError::from_status(
            409,
            br#"{"detail":"Email already registered"}"#,
        ));
        assert_eq!(error.form_message(), "Email already registered");

        let error = AuthError::from(ApiError::from_status(403, br#"{"detail":"Account disabled"}"#));
        assert_eq!(error.form_message(), "Account disabled");
    }

    #[test]
    fn outside_the_forms_the_status_table_wins() {
        let cases = [
            (401, messages::UNAUTHORIZED),
            (403, messages::FORBIDDEN),
            (404, messages::NOT_FOUND),
            (429, messages::QUOTA_EXCEEDED),
        ];
        for (status, expected) in cases {
            let error = AuthError::from(ApiError::from_status(status, br#"{"detail":"custom"}"#));
            assert_eq!(error.user_message(), expected);
        }
        assert_eq!(AuthError::Expired.user_message(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn network_failures_keep_the_retry_hint() {
        let error = AuthError::from(ApiError::network("dns failure"));
        assert_eq!(error.form_message(), messages::NETWORK);
    }

    #[test]
    fn validation_points_at_the_field() {
        let error = AuthError::from(ValidationError::new("email", "Email is required"));
        assert_eq!(error.field(), Some("email"));
        assert_eq!(error.form_message(), "Email is required");
    }
}
