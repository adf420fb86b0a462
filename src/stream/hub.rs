use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::StreamError;
use super::client::{StreamClient, StreamStatus};
use super::connector::StreamConnector;
use super::subscribers::Subscription;
use crate::config::StreamSettings;
use crate::domain::{StreamEvent, Topic};
use crate::session::SessionProvider;
use crate::utils::lock;

/// One [`StreamClient`] per topic, for views that follow several topics at once.
pub struct StreamHub {
    api_root: String,
    session: Arc<dyn SessionProvider>,
    connector: Arc<dyn StreamConnector>,
    settings: StreamSettings,
    clients: Mutex<BTreeMap<Topic, Arc<StreamClient>>>,
}

impl StreamHub {
    pub fn new(
        api_root: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        connector: Arc<dyn StreamConnector>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            api_root: api_root.into(),
            session,
            connector,
            settings,
            clients: Mutex::new(BTreeMap::new()),
        }
    }

    /// The client for `topic`, created idle on first use.
    pub fn client(&self, topic: Topic) -> Arc<StreamClient> {
        lock(&self.clients)
            .entry(topic)
            .or_insert_with(|| {
                Arc::new(StreamClient::new(
                    topic,
                    self.api_root.clone(),
                    self.session.clone(),
                    self.connector.clone(),
                    self.settings,
                ))
            })
            .clone()
    }

    /// Register `callback` on `topic` and make sure its socket is up.
    pub fn subscribe<F>(
        &self,
        topic: Topic,
        filters: Option<Value>,
        callback: F,
    ) -> Result<Subscription, StreamError>
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        let client = self.client(topic);
        client.connect(filters)?;
        Ok(client.on_message(callback))
    }

    pub fn statuses(&self) -> Vec<(Topic, StreamStatus)> {
        lock(&self.clients)
            .iter()
            .map(|(topic, client)| (*topic, client.status()))
            .collect()
    }

    /// Disconnect every topic. Clients and their subscribers stay registered.
    pub fn stop_all(&self) {
        let clients: Vec<Arc<StreamClient>> = lock(&self.clients).values().cloned().collect();
        for client in clients {
            client.stop();
        }
    }
}

impl Drop for StreamHub {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedConnector, TestSession, settle};

    fn hub(connector: &Arc<ScriptedConnector>) -> StreamHub {
        StreamHub::new(
            "https://app.example.com/api/v1",
            TestSession::with_token("tok"),
            connector.clone(),
            StreamSettings::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn one_socket_per_topic() {
        let connector = ScriptedConnector::new();
        let hub = hub(&connector);

        let _a = hub.subscribe(Topic::Prices, None, |_| {}).unwrap();
        let _b = hub.subscribe(Topic::Prices, None, |_| {}).unwrap();
        let _c = hub.subscribe(Topic::Anomalies, None, |_| {}).unwrap();
        settle().await;

        assert_eq!(connector.connects(), 2);
        assert_eq!(
            hub.statuses(),
            [
                (Topic::Prices, StreamStatus::Connected),
                (Topic::Anomalies, StreamStatus::Connected)
            ]
        );
        assert!(
            connector
                .urls()
                .contains(&"wss://app.example.com/api/v1/ws/anomalies?token=tok".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_closes_every_socket() {
        let connector = ScriptedConnector::new();
        let hub = hub(&connector);
        hub.subscribe(Topic::Prices, None, |_| {}).unwrap();
        hub.subscribe(Topic::Trends, None, |_| {}).unwrap();
        settle().await;
        assert_eq!(connector.live(), 2);

        hub.stop_all();
        settle().await;

        assert_eq!(connector.live(), 0);
        assert!(hub.statuses().iter().all(|(_, s)| *s == StreamStatus::Idle));
    }
}
