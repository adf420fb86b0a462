use serde_json::Value;
use strum_macros::Display;
use thiserror::Error;

/// User-facing text for each error class. Shown verbatim in the UI.
pub mod messages {
    pub const UNAUTHORIZED: &str = "Your session has expired. Please log in again.";
    pub const FORBIDDEN: &str = "Access denied. You don't have permission to perform this action.";
    pub const NOT_FOUND: &str = "The requested resource was not found.";
    pub const QUOTA_EXCEEDED: &str =
        "Usage limit exceeded. Upgrade your plan or wait for your quota to reset.";
    pub const TIMEOUT: &str = "The request timed out. Please try again.";
    pub const NETWORK: &str = "Network error. Please check your connection and try again.";
    pub const SERVER: &str = "Something went wrong on our side. Please try again later.";
    pub const DECODE: &str = "The server returned an unexpected response.";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ApiErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    QuotaExceeded,
    Timeout,
    Network,
    Server,
    Decode,
}

/// A failed API call: classification, HTTP status (if one was received), display message
/// and the raw response body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub body: Option<String>,
}

impl ApiError {
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let body = (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned());
        let (kind, message) = match status {
            401 => (ApiErrorKind::Unauthorized, messages::UNAUTHORIZED.to_string()),
            403 => (ApiErrorKind::Forbidden, messages::FORBIDDEN.to_string()),
            404 => (ApiErrorKind::NotFound, messages::NOT_FOUND.to_string()),
            429 => (ApiErrorKind::QuotaExceeded, messages::QUOTA_EXCEEDED.to_string()),
            _ => (
                ApiErrorKind::Server,
                body.as_deref()
                    .and_then(message_from_body)
                    .unwrap_or_else(|| messages::SERVER.to_string()),
            ),
        };
        Self {
            kind,
            status: Some(status),
            message,
            body,
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: ApiErrorKind::Timeout,
            status: None,
            message: messages::TIMEOUT.to_string(),
            body: None,
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            message: messages::NETWORK.to_string(),
            body: Some(detail.into()),
        }
    }

    pub fn decode(status: u16, detail: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            status: Some(status),
            message: messages::DECODE.to_string(),
            body: Some(detail.into()),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Network and timeout failures leave state untouched and are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Timeout | ApiErrorKind::Network)
    }

    /// Server-provided explanation (`detail`, `message` or `error`), if the body carried one.
    pub fn server_detail(&self) -> Option<String> {
        self.body.as_deref().and_then(message_from_body)
    }

    pub fn user_message(&self) -> &str {
        &self.message
    }
}

fn message_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["detail", "message", "error"]
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .map(str::to_string),
        Ok(_) => None,
        // Plain-text bodies are shown as-is; HTML error pages and long dumps are not.
        Err(_) if !trimmed.starts_with('<') && trimmed.len() <= 200 => Some(trimmed.to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_is_fixed() {
        let cases = [
            (401, ApiErrorKind::Unauthorized, messages::UNAUTHORIZED),
            (403, ApiErrorKind::Forbidden, messages::FORBIDDEN),
            (404, ApiErrorKind::NotFound, messages::NOT_FOUND),
            (429, ApiErrorKind::QuotaExceeded, messages::QUOTA_EXCEEDED),
        ];
        for (status, kind, message) in cases {
            let error = ApiError::from_status(status, br#"{"detail":"ignored"}"#);
            assert_eq!(error.kind, kind);
            assert_eq!(error.status, Some(status));
            assert_eq!(error.message, message);
            assert_eq!(error.body.as_deref(), Some(r#"{"detail":"ignored"}"#));
        }
    }

    #[test]
    fn server_errors_prefer_the_body_message() {
        let error = ApiError::from_status(500, br#"{"detail":"Extraction backend offline"}"#);
        assert_eq!(error.kind, ApiErrorKind::Server);
        assert_eq!(error.to_string(), "Extraction backend offline");

        let error = ApiError::from_status(422, br#"{"message":"Unsupported file type"}"#);
        assert_eq!(error.user_message(), "Unsupported file type");
    }

    #[test]
    fn server_errors_fall_back_without_a_usable_body() {
        assert_eq!(ApiError::from_status(502, b"").message, messages::SERVER);
        assert_eq!(ApiError::from_status(502, b"").body, None);
        assert_eq!(
            ApiError::from_status(503, b"<html>Bad Gateway</html>").message,
            messages::SERVER
        );
        assert_eq!(
            ApiError::from_status(500, br#"{"detail":[{"loc":["body"]}]}"#).message,
            messages::SERVER
        );
    }

    #[test]
    fn transport_failures_have_no_status() {
        let timeout = ApiError::timeout();
        assert_eq!(timeout.status, None);
        assert!(timeout.is_retryable());

        let network = ApiError::network("connection refused");
        assert_eq!(network.message, messages::NETWORK);
        assert_eq!(network.body.as_deref(), Some("connection refused"));
    }
}
