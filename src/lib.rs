#![allow(clippy::collapsible_if)]

// Core modules
pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod domain;
pub mod session;
pub mod stream;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types outside of crate
pub use api::{ApiClient, ApiError, ApiErrorKind};
pub use app::{AppContext, Command, Screen};
pub use config::ClientConfig;
pub use session::{AuthError, SessionManager, SessionState};
pub use stream::{StreamClient, StreamHub, StreamStatus};

use std::path::PathBuf;
use std::time::Duration;

// CLI argument parsing
use clap::Parser;

use crate::config::{BACKEND, PERSISTENCE, STREAM};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend origin; the API prefix is appended automatically
    #[arg(long, env = "PROCURELENS_API_URL", default_value = BACKEND.api.base_url)]
    pub api_url: String,

    /// Where the session and preferences are persisted between runs
    #[arg(long, env = "PROCURELENS_STATE_FILE", default_value = PERSISTENCE.state_path)]
    pub state_file: PathBuf,

    /// Reconnects attempted after a stream closes before giving up
    #[arg(long, env = "PROCURELENS_MAX_RECONNECTS", default_value_t = STREAM.max_reconnect_attempts)]
    pub max_reconnects: u32,

    #[arg(long, env = "PROCURELENS_RECONNECT_INTERVAL_MS", default_value_t = STREAM.reconnect_interval_ms)]
    pub reconnect_interval_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default().with_base_url(self.api_url.clone());
        config.state_path = self.state_file.clone();
        config.stream.max_reconnect_attempts = self.max_reconnects;
        config.stream.reconnect_interval = Duration::from_millis(self.reconnect_interval_ms);
        config
    }
}

/// Main application entry point: restore the session, run one command, release everything.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let app = AppContext::from_config(cli.client_config())?;
    app.start().await;
    let result = app::execute(&app, cli.command).await;
    app.shutdown();
    result
}
