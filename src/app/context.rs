use std::sync::{Arc, Mutex, Weak};

use anyhow::{Context, Result};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::state::Screen;
use crate::api::{ApiClient, HttpTransport, ReqwestTransport};
use crate::config::ClientConfig;
use crate::data::{FileTokenStore, QuotaMonitor, TokenStore};
use crate::session::{SessionHandle, SessionManager, SessionState};
use crate::stream::{StreamConnector, StreamHub, TungsteniteConnector};
use crate::utils::lock;

#[cfg(debug_assertions)]
use crate::config::DF;

/// Everything a running client needs, wired around a single session.
pub struct AppContext {
    pub config: ClientConfig,
    pub session: SessionManager,
    pub quota: QuotaMonitor,
    pub streams: Arc<StreamHub>,
    screen_tx: Arc<watch::Sender<Screen>>,
    navigator: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn HttpTransport>,
        connector: Arc<dyn StreamConnector>,
    ) -> Self {
        let api_root = config.api_root();
        let handle = Arc::new(SessionHandle::new(store));
        let api = ApiClient::new(
            api_root.clone(),
            config.request_timeout,
            transport,
            handle.clone(),
        );
        let session = SessionManager::new(api.clone(), handle.clone(), config.renewal_lead);
        let quota = QuotaMonitor::new(api, config.quota_refresh_interval);
        let streams = Arc::new(StreamHub::new(api_root, handle, connector, config.stream));
        let (screen_tx, _) = watch::channel(Screen::Login);

        Self {
            config,
            session,
            quota,
            streams,
            screen_tx: Arc::new(screen_tx),
            navigator: Mutex::new(None),
        }
    }

    /// Production wiring: file-backed store, reqwest and tungstenite.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let store = FileTokenStore::open(&config.state_path).with_context(|| {
            format!("Failed to open session file {}", config.state_path.display())
        })?;
        let transport = ReqwestTransport::new().context("Failed to build HTTP client")?;
        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(transport),
            Arc::new(TungsteniteConnector),
        ))
    }

    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    pub fn screen(&self) -> Screen {
        self.screen_tx.borrow().clone()
    }

    pub fn watch_screen(&self) -> watch::Receiver<Screen> {
        self.screen_tx.subscribe()
    }

    /// Restore the stored session and start following session transitions.
    ///
    /// Leaving the dashboard, by logout or by expiry, tears down live streams and quota
    /// polling.
    pub async fn start(&self) -> SessionState {
        let mut events = self.session.subscribe_events();
        let screen_tx = self.screen_tx.clone();
        let streams: Weak<StreamHub> = Arc::downgrade(&self.streams);
        let quota = self.quota.clone();

        let navigator = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Missed {} session event(s)", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                };
                let Some(screen) = Screen::after(&event) else {
                    continue;
                };
                if screen.is_login() {
                    if let Some(streams) = streams.upgrade() {
                        streams.stop_all();
                    }
                    quota.stop();
                }
                #[cfg(debug_assertions)]
                if DF.log_session {
                    log::info!("Navigating to {:?}", screen);
                }
                screen_tx.send_replace(screen);
            }
        });
        if let Some(previous) = lock(&self.navigator).replace(navigator) {
            previous.abort();
        }

        let state = self.session.start().await;
        self.screen_tx.send_replace(Screen::for_state(&state));
        state
    }

    /// Release everything `start` and the views acquired. Credentials stay persisted.
    pub fn shutdown(&self) {
        if let Some(navigator) = lock(&self.navigator).take() {
            navigator.abort();
        }
        self.streams.stop_all();
        self.quota.stop();
        self.session.stop();
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
