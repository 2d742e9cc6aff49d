//! In-process issuance of anonymous credentials.
//!
//! The anonymous flow has no accounts: a client asks for a session,
//! optionally presenting an `anonymous_id` it saved from an earlier visit,
//! and gets back an opaque credential plus the resolved [`Identity`]. The
//! same `anonymous_id` always resolves to the same identity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::Rng;
use tandem_protocol::IdentityId;

use crate::{Authenticator, Identity, IdentityError, ProfileLimits, ProfileUpdate};

const ADJECTIVES: &[&str] = &[
    "Quiet", "Bold", "Calm", "Bright", "Swift", "Gentle", "Clever", "Brave",
    "Curious", "Lucky", "Sunny", "Witty",
];

const NOUNS: &[&str] = &[
    "Otter", "Fox", "Heron", "Panda", "Falcon", "Koala", "Lynx", "Owl",
    "Dolphin", "Robin", "Tiger", "Wren",
];

/// What a client sends when asking for an anonymous session.
#[derive(Debug, Clone, Default)]
pub struct IssueRequest {
    /// A previously saved anonymous id. Unknown ids start a new identity.
    pub anonymous_id: Option<String>,
    /// Preferred display alias. A random one is generated when absent.
    pub alias: Option<String>,
    /// Initial profile. Ignored for a returning `anonymous_id`.
    pub profile: ProfileUpdate,
}

/// The result of a successful issuance.
#[derive(Debug, Clone)]
pub struct Issued {
    /// Opaque credential to present when opening the relay connection.
    pub credential: String,
    pub identity: Identity,
}

#[derive(Default)]
struct Registry {
    credentials: HashMap<String, IdentityId>,
    anonymous: HashMap<String, IdentityId>,
    identities: HashMap<IdentityId, Identity>,
}

/// Issues anonymous credentials and authenticates them.
pub struct AnonymousIssuer {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    limits: ProfileLimits,
}

impl AnonymousIssuer {
    pub fn new(limits: ProfileLimits) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
            limits,
        }
    }

    /// Issues a fresh credential.
    ///
    /// Every call yields a new credential; earlier credentials for the
    /// same identity stay valid.
    pub fn issue(&self, request: IssueRequest) -> Issued {
        let credential = generate_credential();
        let mut registry = self.registry.lock();

        let known = request
            .anonymous_id
            .as_ref()
            .and_then(|anon| registry.anonymous.get(anon).copied())
            .and_then(|id| registry.identities.get(&id).cloned());

        let identity = match known {
            Some(identity) => identity,
            None => {
                let id = IdentityId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let alias = request
                    .alias
                    .as_deref()
                    .map(|raw| crate::sanitize_text(raw, self.limits.max_label_chars))
                    .filter(|alias| !alias.is_empty())
                    .unwrap_or_else(generate_alias);
                let mut identity = Identity::new(id, alias);
                identity.apply(&request.profile, &self.limits);

                if let Some(anon) = request.anonymous_id {
                    registry.anonymous.insert(anon, id);
                }
                registry.identities.insert(id, identity.clone());
                tracing::info!(identity = %id, alias = %identity.alias, "identity issued");
                identity
            }
        };

        registry.credentials.insert(credential.clone(), identity.id);
        Issued {
            credential,
            identity,
        }
    }

    /// Resolves a credential without going through the async trait.
    pub fn resolve(&self, credential: &str) -> Result<Identity, IdentityError> {
        let registry = self.registry.lock();
        registry
            .credentials
            .get(credential)
            .and_then(|id| registry.identities.get(id))
            .cloned()
            .ok_or_else(|| IdentityError::InvalidCredential("unknown credential".into()))
    }
}

impl Default for AnonymousIssuer {
    fn default() -> Self {
        Self::new(ProfileLimits::default())
    }
}

impl Authenticator for AnonymousIssuer {
    async fn authenticate(&self, credential: &str) -> Result<Identity, IdentityError> {
        if credential.is_empty() {
            return Err(IdentityError::AuthRequired);
        }
        self.resolve(credential)
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_credential() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generates an alias like `"QuietOtter42"`.
fn generate_alias() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number: u8 = rng.random_range(10..100);
    format!("{adjective}{noun}{number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_generates_hex_credential_and_alias() {
        let issuer = AnonymousIssuer::default();
        let issued = issuer.issue(IssueRequest::default());

        assert_eq!(issued.credential.len(), 32);
        assert!(issued.credential.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!issued.identity.alias.is_empty());
        assert_eq!(issued.identity.native_language, "pt");
    }

    #[test]
    fn test_issue_applies_initial_profile() {
        let issuer = AnonymousIssuer::default();
        let issued = issuer.issue(IssueRequest {
            alias: Some("Ana".into()),
            profile: ProfileUpdate {
                native_language: Some("es".into()),
                target_language: Some("en".into()),
                interests: Some(vec!["music".into()]),
                region: Some("MX".into()),
            },
            ..Default::default()
        });

        let identity = issued.identity;
        assert_eq!(identity.alias, "Ana");
        assert_eq!(identity.native_language, "es");
        assert_eq!(identity.region, "MX");
        assert!(identity.interests.contains("music"));
    }

    #[test]
    fn test_issue_same_anonymous_id_resolves_same_identity() {
        let issuer = AnonymousIssuer::default();
        let first = issuer.issue(IssueRequest {
            anonymous_id: Some("device-1".into()),
            ..Default::default()
        });
        let second = issuer.issue(IssueRequest {
            anonymous_id: Some("device-1".into()),
            ..Default::default()
        });

        assert_eq!(first.identity.id, second.identity.id);
        assert_ne!(first.credential, second.credential);
        // Both credentials stay valid.
        assert!(issuer.resolve(&first.credential).is_ok());
        assert!(issuer.resolve(&second.credential).is_ok());
    }

    #[test]
    fn test_issue_distinct_requests_get_distinct_identities() {
        let issuer = AnonymousIssuer::default();
        let a = issuer.issue(IssueRequest::default());
        let b = issuer.issue(IssueRequest::default());
        assert_ne!(a.identity.id, b.identity.id);
    }

    #[tokio::test]
    async fn test_authenticate_issued_credential() {
        let issuer = AnonymousIssuer::default();
        let issued = issuer.issue(IssueRequest::default());

        let identity = issuer.authenticate(&issued.credential).await.unwrap();
        assert_eq!(identity, issued.identity);
    }

    #[tokio::test]
    async fn test_authenticate_unknown_credential_is_invalid() {
        let issuer = AnonymousIssuer::default();
        let result = issuer.authenticate("deadbeef").await;
        assert!(matches!(result, Err(IdentityError::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_authenticate_empty_credential_is_required() {
        let issuer = AnonymousIssuer::default();
        let result = issuer.authenticate("").await;
        assert!(matches!(result, Err(IdentityError::AuthRequired)));
    }

    #[test]
    fn test_generate_alias_shape() {
        let alias = generate_alias();
        assert!(alias.chars().next().is_some_and(|c| c.is_ascii_uppercase()));
        assert!(alias.chars().rev().take(2).all(|c| c.is_ascii_digit()));
    }
}
