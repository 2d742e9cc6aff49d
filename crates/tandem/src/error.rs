//! Unified error type for Tandem.

use tandem_identity::IdentityError;
use tandem_match::MatchError;
use tandem_protocol::ProtocolError;
use tandem_transport::TransportError;

use crate::TranslateError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TandemError {
    /// A transport-level error (bind, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The credential was missing or rejected.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A queue join or session creation was refused.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The translation provider failed.
    #[error(transparent)]
    Translate(#[from] TranslateError),
}
