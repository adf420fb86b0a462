use async_trait::async_trait;
use futures::{SinkExt, StreamExt, stream::BoxStream};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

#[cfg(debug_assertions)]
use crate::config::DF;

/// What the socket delivers, reduced to what the stream client acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    /// Transport-level error. The socket reports its close separately.
    Error(String),
    Closed { code: Option<u16>, reason: String },
}

/// An open socket. Dropping `outbound` closes it.
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: BoxStream<'static, Frame>,
}

#[derive(Debug, Error)]
#[error("could not open event stream: {0}")]
pub struct ConnectError(pub String);

#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Connection, ConnectError>;
}

pub struct TungsteniteConnector;

#[async_trait]
impl StreamConnector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Connection, ConnectError> {
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectError(e.to_string()))?;

        let (mut write, read) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        // Writer: forwards control messages until every sender is gone, then closes.
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    log::warn!("Event stream write failed: {}", e);
                    return;
                }
            }
            #[cfg(debug_assertions)]
            if DF.log_stream_lifecycle {
                log::info!("Closing event stream socket");
            }
            let _ = write.send(Message::Close(None)).await;
        });

        let inbound = read
            .filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => Some(Frame::Text(text.as_str().to_owned())),
                    Ok(Message::Close(frame)) => Some(Frame::Closed {
                        code: frame.as_ref().map(|f| u16::from(f.code)),
                        reason: frame
                            .map(|f| f.reason.as_str().to_owned())
                            .unwrap_or_default(),
                    }),
                    // Ping/pong are answered by tungstenite; binary frames are not part of the protocol.
                    Ok(_) => None,
                    Err(e) => Some(Frame::Error(e.to_string())),
                }
            })
            .boxed();

        Ok(Connection { outbound, inbound })
    }
}
