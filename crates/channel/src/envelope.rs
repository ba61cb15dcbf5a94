//! Wire envelope for the realtime channel.
//!
//! Frames are UTF-8 JSON of the shape `{"message_type": <kind>, "data":
//! <payload>}`; inbound frames additionally carry `"from_username"`, stamped
//! by the server. The kind catalog is closed: adding a kind means extending
//! [`Envelope`] and [`MessageKind`] together. Frames with an unknown
//! `message_type` fail decoding and are dropped at the dispatch wrapper.

use serde::{Deserialize, Serialize};

/// A typed channel message, keyed by its kind discriminator on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "data")]
pub enum Envelope {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "set:username")]
    SetUsername { username: String },
}

impl Envelope {
    pub fn kind(&self) -> MessageKind {
        match self {
            Envelope::Text { .. } => MessageKind::Text,
            Envelope::SetUsername { .. } => MessageKind::SetUsername,
        }
    }
}

/// Discriminator for the closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    SetUsername,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::SetUsername => "set:username",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound envelope plus the sender identity supplied by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedEnvelope {
    pub from_username: String,
    #[serde(flatten)]
    pub envelope: Envelope,
}

pub fn encode_envelope(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

pub fn decode_received(frame: &str) -> Result<ReceivedEnvelope, serde_json::Error> {
    serde_json::from_str(frame)
}
