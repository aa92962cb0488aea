//! WebSocket client for the scraper's push-update endpoint.
//!
//! [`LiveClient`] holds the endpoint configuration. Call
//! [`LiveClient::connect`] to establish a subscribed [`LiveConnection`].

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::messages::SubscribeMessage;

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for the push-update endpoint.
#[derive(Debug, Clone)]
pub struct LiveClient {
    ws_url: String,
    islands: Vec<String>,
}

/// A live, subscribed WebSocket connection.
pub struct LiveConnection {
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: WsStream,
}

impl LiveClient {
    /// * `ws_url`  - full WebSocket URL, e.g. `ws://localhost:8000/ws`.
    /// * `islands` - island ids to subscribe to on every connect.
    pub fn new(ws_url: impl Into<String>, islands: Vec<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            islands,
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn islands(&self) -> &[String] {
        &self.islands
    }

    /// Connect and send the subscribe message for the full island set.
    pub async fn connect(&self) -> Result<LiveConnection, LiveClientError> {
        let (mut ws_stream, _response) = connect_async(self.ws_url.as_str()).await.map_err(|e| {
            LiveClientError::Connection(format!("Failed to connect to {}: {e}", self.ws_url))
        })?;

        let subscribe = SubscribeMessage::new(&self.islands).to_json();
        ws_stream
            .send(Message::Text(subscribe))
            .await
            .map_err(|e| LiveClientError::Protocol(format!("Failed to subscribe: {e}")))?;

        tracing::info!(
            url = %self.ws_url,
            islands = self.islands.len(),
            "Connected to live updates",
        );

        Ok(LiveConnection { ws_stream })
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum LiveClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
