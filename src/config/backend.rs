/// REST endpoint defaults.
pub struct ApiDefaults {
    pub base_url: &'static str,
    pub prefix: &'static str,
    pub request_timeout_ms: u64,
    pub user_agent: &'static str,
}

/// Access-token lifecycle defaults.
pub struct SessionDefaults {
    /// How long before the `exp` claim the silent renewal fires.
    pub renewal_lead_secs: u64,
}

pub struct QuotaDefaults {
    pub refresh_interval_secs: u64,
}

pub struct BackendConfig {
    pub api: ApiDefaults,
    pub session: SessionDefaults,
    pub quota: QuotaDefaults,
}

pub const BACKEND: BackendConfig = BackendConfig {
    api: ApiDefaults {
        base_url: "http://localhost:8000",
        prefix: "/api/v1",
        request_timeout_ms: 30_000,
        user_agent: concat!("procurelens-client/", env!("CARGO_PKG_VERSION")),
    },
    session: SessionDefaults {
        renewal_lead_secs: 5 * 60,
    },
    quota: QuotaDefaults {
        refresh_interval_secs: 60,
    },
};

/// Backend route table. Paths are relative to `base_url + prefix`.
pub mod routes {
    pub const AUTH_LOGIN: &str = "/auth/login";
    pub const AUTH_REGISTER: &str = "/auth/register";
    pub const AUTH_REFRESH: &str = "/auth/refresh";
    pub const AUTH_ME: &str = "/auth/me";
    pub const AUTH_LOGOUT: &str = "/auth/logout";
    pub const CONVERSIONS: &str = "/conversions";
    pub const SCHEMA: &str = "/schema";
    pub const SUMMARY: &str = "/summary";
    pub const OUTPUTS: &str = "/outputs";
    pub const QUOTA: &str = "/quota";
    pub const FEEDBACK: &str = "/feedback";
    pub const DOCUMENTS: &str = "/documents";
    pub const DOCS_EXTRACT: &str = "/docs/extract";
    pub const WS: &str = "/ws";

    pub fn doc_export(document_id: &str) -> String {
        format!("/docs/{}/export", document_id)
    }
}
