// Reconnecting WebSocket subscriptions to server-pushed events
mod client;
mod connector;
mod endpoint;
mod history;
mod hub;
mod subscribers;

use thiserror::Error;

pub use {
    client::{StreamClient, StreamStatus},
    connector::{ConnectError, Connection, Frame, StreamConnector, TungsteniteConnector},
    endpoint::stream_url,
    history::EventHistory,
    hub::StreamHub,
    subscribers::Subscription,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Sign in to receive live updates.")]
    NotAuthenticated,
    #[error("invalid event stream endpoint: {0}")]
    InvalidEndpoint(String),
}
