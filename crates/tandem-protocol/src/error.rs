//! Error types for the protocol layer.
//!
//! Each crate in Tandem defines its own error enum, so a `ProtocolError`
//! always means the problem is in turning bytes into events or back.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a frame without a `type` string,
    /// or a payload whose fields have the wrong shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level even though it
    /// parsed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
