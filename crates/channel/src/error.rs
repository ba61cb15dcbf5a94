use inklet_core::identity::IdentityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("websocket handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("connection is not open")]
    NotOpen,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("envelope codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}
