//! # inklet-channel
//!
//! Client-side manager for Inklet's single realtime WebSocket channel.
//!
//! The channel is identity-addressed: each client connects as exactly one
//! identity (a persisted UUID appended to the endpoint URL) and holds at
//! most one live connection at a time. [`ChannelManager`] enforces that
//! invariant, keeps a registry of listeners whose lifetime is independent
//! of any particular socket, and transparently reattaches them when the
//! connection is replaced.
//!
//! ```no_run
//! use inklet_channel::{ChannelConfig, ChannelManager, Envelope, MessageKind};
//!
//! # async fn run() -> Result<(), inklet_channel::ChannelError> {
//! let mut manager = ChannelManager::with_defaults(ChannelConfig::default())?;
//!
//! manager
//!     .listen_for(MessageKind::Text, |received| {
//!         println!("{}: {:?}", received.from_username, received.envelope);
//!     })
//!     .await?;
//!
//! manager
//!     .send(Envelope::Text {
//!         text: "hello".to_owned(),
//!     })
//!     .await?;
//!
//! while manager.dispatch_next().await? {}
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod envelope;
pub mod error;
pub mod listeners;
pub mod transport;

pub use connection::{ActiveConnection, ChannelManager, ConnectionState};
pub use envelope::{
    decode_received, encode_envelope, Envelope, MessageKind, ReceivedEnvelope,
};
pub use error::ChannelError;
pub use listeners::{EventCategory, ListenerCallback, ListenerHandle};
pub use transport::{ChannelConfig, SocketTransport, WebSocketTransport};
