use std::path::PathBuf;
use std::time::Duration;

use super::{BACKEND, PERSISTENCE, STREAM};

/// Reconnect and buffering policy for one topic subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub max_reconnect_attempts: u32,
    pub reconnect_interval: Duration,
    pub history_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: STREAM.max_reconnect_attempts,
            reconnect_interval: Duration::from_millis(STREAM.reconnect_interval_ms),
            history_capacity: STREAM.history_capacity,
        }
    }
}

/// Runtime configuration, seeded from the compile-time tables and overridable per deployment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://app.example.com`. The `/api/v1` prefix is appended.
    pub base_url: String,
    pub request_timeout: Duration,
    pub renewal_lead: Duration,
    pub quota_refresh_interval: Duration,
    pub state_path: PathBuf,
    pub stream: StreamSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BACKEND.api.base_url.to_string(),
            request_timeout: Duration::from_millis(BACKEND.api.request_timeout_ms),
            renewal_lead: Duration::from_secs(BACKEND.session.renewal_lead_secs),
            quota_refresh_interval: Duration::from_secs(BACKEND.quota.refresh_interval_secs),
            state_path: PathBuf::from(PERSISTENCE.state_path),
            stream: StreamSettings::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `base_url` joined with the API prefix, without a trailing slash.
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with(BACKEND.api.prefix) {
            base.to_string()
        } else {
            format!("{}{}", base, BACKEND.api.prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_root_appends_prefix_once() {
        let config = ClientConfig::default().with_base_url("https://example.test/");
        assert_eq!(config.api_root(), "https://example.test/api/v1");

        let already = ClientConfig::default().with_base_url("https://example.test/api/v1");
        assert_eq!(already.api_root(), "https://example.test/api/v1");
    }

    #[test]
    fn defaults_follow_the_config_tables() {
        let config = ClientConfig::default();
        assert_eq!(config.renewal_lead, Duration::from_secs(300));
        assert_eq!(config.stream.max_reconnect_attempts, STREAM.max_reconnect_attempts);
        assert_eq!(config.stream.history_capacity, 100);
    }
}
