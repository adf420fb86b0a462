use serde::{Deserialize, Serialize};

/// Response of `/auth/login` and `/auth/refresh`.
///
/// `/auth/refresh` may omit `refresh_token`; the existing one is then kept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body of `POST /auth/refresh`.
#[derive(Serialize, Debug, Clone)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Claims read from the access token payload. Only `exp` is required.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, unix seconds.
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl AccessClaims {
    pub fn expires_at_ms(&self) -> i64 {
        self.exp.saturating_mul(1000)
    }
}
