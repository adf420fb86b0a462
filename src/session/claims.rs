//! Reading the expiry out of an access token.
//!
//! The payload is decoded WITHOUT verifying the signature. This is a trust boundary,
//! not a security check: the token was issued moments earlier by the backend over TLS
//! and is only inspected to decide when to renew it. The backend still validates it
//! on every request.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use thiserror::Error;

use crate::domain::AccessClaims;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenDecodeError {
    #[error("token is not a three-part JWT")]
    Malformed,
    #[error("token payload is not valid base64url: {0}")]
    Base64(String),
    #[error("token payload is not valid claims JSON: {0}")]
    Json(String),
}

pub fn decode_claims(token: &str) -> Result<AccessClaims, TokenDecodeError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenDecodeError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenDecodeError::Base64(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenDecodeError::Json(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::jwt_with_claims;
    use serde_json::json;

    #[test]
    fn reads_exp_and_subject() {
        let token = jwt_with_claims(json!({"sub": "user-7", "exp": 1_900_000_000, "iat": 1_899_999_000}));
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.exp, 1_900_000_000);
        assert_eq!(claims.sub.as_deref(), Some("user-7"));
        assert_eq!(claims.expires_at_ms(), 1_900_000_000_000);
    }

    #[test]
    fn tolerates_padded_payloads() {
        let token = jwt_with_claims(json!({"exp": 1}));
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1].push_str("==");
        assert_eq!(decode_claims(&parts.join(".")).unwrap().exp, 1);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert_eq!(decode_claims("opaque-token"), Err(TokenDecodeError::Malformed));
        assert_eq!(decode_claims("a.b.c.d"), Err(TokenDecodeError::Malformed));
        assert!(matches!(decode_claims("a.!!!.c"), Err(TokenDecodeError::Base64(_))));

        let no_exp = jwt_with_claims(json!({"sub": "x"}));
        assert!(matches!(decode_claims(&no_exp), Err(TokenDecodeError::Json(_))));
    }
}
