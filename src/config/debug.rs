//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Session lifecycle transitions (login, restore, logout, expiry).
    pub log_session: bool,

    /// Renewal timer arming, cancellation and firing.
    pub log_renewal: bool,

    /// One line per REST request with method, path and status.
    pub log_api_requests: bool,

    /// Emit verbose logging for every received stream frame.
    pub log_stream_frames: bool,

    /// Socket open/close/reconnect transitions.
    pub log_stream_lifecycle: bool,

    pub log_quota: bool,
}

pub const DF: LogFlags = LogFlags {
    log_session: true,
    log_renewal: true,
    log_stream_lifecycle: true,

    log_api_requests: false,
    log_stream_frames: false,
    log_quota: false,
};
