use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use serde_json::{Value, json};
use strum_macros::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::StreamError;
use super::connector::{Connection, Frame, StreamConnector};
use super::endpoint::stream_url;
use super::history::EventHistory;
use super::subscribers::{SubscriberSet, Subscription};
use crate::config::StreamSettings;
use crate::domain::{StreamEvent, Topic};
use crate::session::SessionProvider;
use crate::utils::lock;

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StreamStatus {
    Idle,
    Connecting,
    Connected,
    /// Socket closed; waiting out the reconnect interval.
    Reconnecting,
    /// Reconnect cap reached. Only an explicit `connect` leaves this state.
    Failed,
}

/// Live subscription to one topic, surviving transient disconnects.
///
/// Dropping the client closes the socket and cancels any pending reconnect.
pub struct StreamClient {
    inner: Arc<StreamInner>,
}

struct StreamInner {
    topic: Topic,
    api_root: String,
    session: Arc<dyn SessionProvider>,
    connector: Arc<dyn StreamConnector>,
    settings: StreamSettings,

    subscribers: Arc<SubscriberSet<StreamEvent>>,
    history: Mutex<EventHistory>,
    status_tx: watch::Sender<StreamStatus>,
    attempts: AtomicU32,
    last_error: Mutex<Option<String>>,
    filters: Mutex<Option<Value>>,

    /// Bumped by every connect and disconnect. A driver whose generation is stale stops
    /// touching shared state.
    generation: AtomicU64,
    driver: Mutex<Option<JoinHandle<()>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl StreamClient {
    pub fn new(
        topic: Topic,
        api_root: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        connector: Arc<dyn StreamConnector>,
        settings: StreamSettings,
    ) -> Self {
        let (status_tx, _) = watch::channel(StreamStatus::Idle);
        Self {
            inner: Arc::new(StreamInner {
                topic,
                api_root: api_root.into(),
                session,
                connector,
                settings,
                subscribers: SubscriberSet::new(),
                history: Mutex::new(EventHistory::new(settings.history_capacity)),
                status_tx,
                attempts: AtomicU32::new(0),
                last_error: Mutex::new(None),
                filters: Mutex::new(None),
                generation: AtomicU64::new(0),
                driver: Mutex::new(None),
                outbound: Mutex::new(None),
            }),
        }
    }

    /// Open the socket, sending a subscribe control message with `filters` once it is up.
    ///
    /// A no-op while a connection is being made or is established.
    pub fn connect(&self, filters: Option<Value>) -> Result<(), StreamError> {
        let mut driver = lock(&self.inner.driver);
        let running = driver.as_ref().is_some_and(|handle| !handle.is_finished());
        if running && self.status() != StreamStatus::Failed {
            #[cfg(debug_assertions)]
            if DF.log_stream_lifecycle {
                log::info!("{} stream already running; connect ignored", self.inner.topic);
            }
            return Ok(());
        }
        if self.inner.session.access_token().is_none() {
            return Err(StreamError::NotAuthenticated);
        }

        *lock(&self.inner.filters) = filters;
        *lock(&self.inner.last_error) = None;
        self.inner.attempts.store(0, Ordering::SeqCst);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.set_status(StreamStatus::Connecting);

        if let Some(stale) = driver.take() {
            stale.abort();
        }
        *driver = Some(tokio::spawn(run_driver(self.inner.clone(), generation)));
        Ok(())
    }

    /// Close the socket and cancel any pending reconnect. Idempotent.
    pub fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let had_driver = match lock(&self.inner.driver).take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        };
        lock(&self.inner.outbound).take();
        self.inner.set_status(StreamStatus::Idle);

        #[cfg(debug_assertions)]
        if had_driver && DF.log_stream_lifecycle {
            log::info!("{} stream disconnected", self.inner.topic);
        }
        #[cfg(not(debug_assertions))]
        let _ = had_driver;
    }

    /// Acquire: connect with the filters from the previous `connect`, if any.
    pub fn start(&self) -> Result<(), StreamError> {
        let filters = lock(&self.inner.filters).clone();
        self.connect(filters)
    }

    /// Release.
    pub fn stop(&self) {
        self.disconnect();
    }

    /// Replace the filters and, when connected, resend the subscribe control message.
    pub fn update_filters(&self, filters: Value) {
        *lock(&self.inner.filters) = Some(filters.clone());
        if let Some(outbound) = lock(&self.inner.outbound).as_ref() {
            let _ = outbound.send(subscribe_message(&filters));
        }
    }

    pub fn on_message<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.add(callback)
    }

    pub fn topic(&self) -> Topic {
        self.inner.topic
    }

    pub fn status(&self) -> StreamStatus {
        *self.inner.status_tx.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<StreamStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == StreamStatus::Connected
    }

    /// Reconnects made since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.last_error).clone()
    }

    /// Retained events, oldest first.
    pub fn history(&self) -> Vec<StreamEvent> {
        lock(&self.inner.history).to_vec()
    }

    pub fn clear_history(&self) {
        lock(&self.inner.history).clear();
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn subscribe_message(filters: &Value) -> String {
    json!({"action": "subscribe", "filters": filters}).to_string()
}

impl StreamInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_status(&self, status: StreamStatus) {
        self.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    fn record_error(&self, message: String) {
        *lock(&self.last_error) = Some(message);
    }

    fn handle_text(&self, text: &str) {
        let event: StreamEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Dropping unreadable {} frame: {}", self.topic, e);
                return;
            }
        };

        lock(&self.history).push(event.clone());
        let delivered = self.subscribers.dispatch(&event);

        #[cfg(debug_assertions)]
        if DF.log_stream_frames {
            log::info!("[{}] {} -> {} subscriber(s)", self.topic, event, delivered);
        }
        #[cfg(not(debug_assertions))]
        let _ = delivered;
    }

    /// One socket lifetime. Returns once it closes or could not be opened.
    async fn run_connection(&self, generation: u64) {
        // Re-read on every attempt: the session may have renewed the token meanwhile.
        let Some(token) = self.session.access_token() else {
            self.record_error(StreamError::NotAuthenticated.to_string());
            return;
        };
        let url = match stream_url(&self.api_root, self.topic, &token) {
            Ok(url) => url,
            Err(e) => {
                self.record_error(e.to_string());
                return;
            }
        };

        let Connection {
            outbound,
            mut inbound,
        } = match self.connector.connect(&url).await {
            Ok(connection) => connection,
            Err(e) => {
                log::warn!("{} stream: {}", self.topic, e);
                self.record_error(e.to_string());
                return;
            }
        };
        if !self.is_current(generation) {
            return;
        }

        self.attempts.store(0, Ordering::SeqCst);
        self.set_status(StreamStatus::Connected);
        #[cfg(debug_assertions)]
        if DF.log_stream_lifecycle {
            log::info!("{} stream connected", self.topic);
        }

        if let Some(filters) = lock(&self.filters).as_ref() {
            let _ = outbound.send(subscribe_message(filters));
        }
        *lock(&self.outbound) = Some(outbound);

        while let Some(frame) = inbound.next().await {
            if !self.is_current(generation) {
                return;
            }
            match frame {
                Frame::Text(text) => self.handle_text(&text),
                Frame::Error(detail) => {
                    log::warn!("{} stream error: {}", self.topic, detail);
                    self.record_error(format!("Stream error: {}", detail));
                }
                Frame::Closed { code, reason } => {
                    #[cfg(debug_assertions)]
                    if DF.log_stream_lifecycle {
                        log::info!("{} stream closed ({:?}) {}", self.topic, code, reason);
                    }
                    #[cfg(not(debug_assertions))]
                    let _ = (code, reason);
                    break;
                }
            }
        }

        if self.is_current(generation) {
            lock(&self.outbound).take();
        }
    }
}

/// Connect, and reconnect after every close until the attempt cap is reached.
async fn run_driver(inner: Arc<StreamInner>, generation: u64) {
    loop {
        inner.run_connection(generation).await;
        if !inner.is_current(generation) {
            return;
        }

        let attempts = inner.attempts.load(Ordering::SeqCst);
        if attempts >= inner.settings.max_reconnect_attempts {
            let message = format!("Connection failed after {} attempts", attempts);
            log::error!("{} stream: {}", inner.topic, message);
            inner.record_error(message);
            inner.set_status(StreamStatus::Failed);
            return;
        }

        inner.set_status(StreamStatus::Reconnecting);
        #[cfg(debug_assertions)]
        if DF.log_stream_lifecycle {
            log::info!(
                "{} stream reconnecting in {:?} (attempt {}/{})",
                inner.topic,
                inner.settings.reconnect_interval,
                attempts + 1,
                inner.settings.max_reconnect_attempts
            );
        }
        tokio::time::sleep(inner.settings.reconnect_interval).await;
        if !inner.is_current(generation) {
            return;
        }
        inner.attempts.fetch_add(1, Ordering::SeqCst);
        inner.set_status(StreamStatus::Connecting);
    }
}
