//! Error types for the match layer.

use tandem_protocol::IdentityId;

/// Reasons a queue join or session creation is refused.
///
/// None of these close a connection; the relay turns them into typed
/// responses for the requester.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// The identity already has a queue entry.
    #[error("{0} is already queued")]
    AlreadyQueued(IdentityId),

    /// The identity is a member of an active session.
    #[error("{0} is already in a session")]
    AlreadyInSession(IdentityId),

    /// A session needs two distinct members.
    #[error("{0} cannot be paired with itself")]
    SameIdentity(IdentityId),
}
