//! Platform transport for the realtime channel.

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::ChannelError;

/// Endpoint configuration for the channel transport.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub endpoint: String,
}

impl ChannelConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new("ws://localhost:3030/ws")
    }
}

impl From<&inklet_core::ClientConfig> for ChannelConfig {
    fn from(config: &inklet_core::ClientConfig) -> Self {
        Self::new(config.server.websocket_url.clone())
    }
}

/// Full-duplex text-frame transport addressed by a client identity.
///
/// `recv` resolves to `Ok(None)` once the peer closes the channel. The
/// production implementation is [`WebSocketTransport`]; tests substitute
/// their own.
pub trait SocketTransport: Send + 'static {
    fn connect(
        config: &ChannelConfig,
        identity: &str,
    ) -> impl Future<Output = Result<Self, ChannelError>> + Send
    where
        Self: Sized;

    fn send(&mut self, frame: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    fn recv(&mut self) -> impl Future<Output = Result<Option<String>, ChannelError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// The endpoint with the identity appended as the `uuid` query parameter,
/// which is how the server addresses the client's logical channel.
fn endpoint_url(config: &ChannelConfig, identity: &str) -> String {
    format!("{}?uuid={}", config.endpoint, identity)
}

/// WebSocket transport via tokio-tungstenite.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SocketTransport for WebSocketTransport {
    async fn connect(config: &ChannelConfig, identity: &str) -> Result<Self, ChannelError> {
        let url = endpoint_url(config, identity);
        debug!(%url, "opening websocket");
        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|error| ChannelError::HandshakeFailed(error.to_string()))?;
        Ok(Self { stream })
    }

    async fn send(&mut self, frame: &str) -> Result<(), ChannelError> {
        self.stream
            .send(Message::text(frame))
            .await
            .map_err(|error| ChannelError::Transport(error.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>, ChannelError> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                Ok(Message::Close(_)) => return Ok(None),
                // Control and binary frames are not part of the envelope protocol.
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(error) => return Err(ChannelError::Transport(error.to_string())),
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(error) => Err(ChannelError::Transport(error.to_string())),
        }
    }
}
