//! Error types for the protocol layer.

/// Errors that can occur while turning wire bytes into messages and back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not a message we understand: malformed JSON, a
    /// missing field, or an unsupported `type` discriminator.
    #[cfg(feature = "json")]
    #[error("malformed event: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but is not acceptable where it arrived,
    /// e.g. an `add` posted to the sound endpoint.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
