//! Error types for the identity layer.

use tandem_protocol::IdentityId;

/// Errors that can occur while resolving who a participant is.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The connection presented no credential at all.
    #[error("credential required")]
    AuthRequired,

    /// The credential was presented but not recognized, or was rejected
    /// by the [`Authenticator`](crate::Authenticator).
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// No profile exists for the given identity.
    #[error("identity {0} not found")]
    NotFound(IdentityId),
}

impl IdentityError {
    /// The short code sent to the client in an `error` frame.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRequired => "token_required",
            Self::InvalidCredential(_) => "invalid_token",
            Self::NotFound(_) => "identity_not_found",
        }
    }
}
