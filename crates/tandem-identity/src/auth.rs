//! Authentication hook for resolving who is on the other end of a
//! connection.
//!
//! Tandem doesn't care how a credential was issued. The relay asks an
//! [`Authenticator`] to turn the credential captured at handshake time
//! into an [`Identity`], and refuses the connection if it can't.
//!
//! Because this is a trait, production can verify signed tokens against
//! an external issuer, development can use the in-process
//! [`AnonymousIssuer`](crate::AnonymousIssuer), and tests can accept
//! anything.

use std::sync::Arc;

use crate::{Identity, IdentityError};

/// Validates a client's credential and returns their identity.
///
/// `Send + Sync + 'static` because the authenticator lives in shared
/// server state for the whole process.
///
/// # Example
///
/// ```rust
/// use tandem_identity::{Authenticator, Identity, IdentityError};
/// use tandem_protocol::IdentityId;
///
/// /// Uses the credential as a numeric identity id.
/// /// Only for development!
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(
///         &self,
///         credential: &str,
///     ) -> Result<Identity, IdentityError> {
///         let id: u64 = credential.parse().map_err(|_| {
///             IdentityError::InvalidCredential("not a number".into())
///         })?;
///         Ok(Identity::new(IdentityId(id), format!("Guest{id}")))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the credential and returns the participant's identity.
    ///
    /// # Returns
    /// - `Ok(Identity)`: here's who they are
    /// - `Err(IdentityError::InvalidCredential)`: credential rejected
    fn authenticate(
        &self,
        credential: &str,
    ) -> impl std::future::Future<Output = Result<Identity, IdentityError>> + Send;
}

/// A shared authenticator, so the same issuer can hand out credentials
/// and verify them.
impl<A: Authenticator> Authenticator for Arc<A> {
    fn authenticate(
        &self,
        credential: &str,
    ) -> impl std::future::Future<Output = Result<Identity, IdentityError>> + Send {
        (**self).authenticate(credential)
    }
}
