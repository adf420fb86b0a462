pub struct StreamDefaults {
    /// Reconnects scheduled after the initial connection before the topic is marked failed.
    pub max_reconnect_attempts: u32,
    pub reconnect_interval_ms: u64,
    /// Number of most-recent events kept per topic.
    pub history_capacity: usize,
}

pub const STREAM: StreamDefaults = StreamDefaults {
    max_reconnect_attempts: 5,
    reconnect_interval_ms: 3_000,
    history_capacity: 100,
};
