//! The identity store: the live profile of everyone who has connected.
//!
//! # Concurrency note
//!
//! `IdentityStore` is a plain `HashMap` and is NOT thread-safe by itself.
//! The relay wraps it in a lock and only ever holds that lock for one
//! synchronous call.

use std::collections::HashMap;

use tandem_protocol::IdentityId;

use crate::{Identity, IdentityError, ProfileLimits, ProfileUpdate};

/// Holds the current profile for each identity, for the process lifetime.
#[derive(Debug, Default)]
pub struct IdentityStore {
    identities: HashMap<IdentityId, Identity>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an identity on connect.
    ///
    /// A returning identity keeps the profile it already has here (edits
    /// made on an earlier connection survive a reconnect); only a new
    /// identity is stored as given. Returns the stored profile.
    pub fn upsert(&mut self, identity: Identity) -> Identity {
        self.identities
            .entry(identity.id)
            .or_insert(identity)
            .clone()
    }

    pub fn get(&self, id: &IdentityId) -> Option<&Identity> {
        self.identities.get(id)
    }

    /// Applies a profile edit and returns the updated profile.
    ///
    /// # Errors
    /// Returns [`IdentityError::NotFound`] if the identity never connected.
    pub fn update(
        &mut self,
        id: IdentityId,
        update: &ProfileUpdate,
        limits: &ProfileLimits,
    ) -> Result<&Identity, IdentityError> {
        let identity = self
            .identities
            .get_mut(&id)
            .ok_or(IdentityError::NotFound(id))?;
        identity.apply(update, limits);
        tracing::debug!(identity = %id, "profile updated");
        Ok(identity)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
