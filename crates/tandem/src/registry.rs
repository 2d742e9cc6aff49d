//! The connection registry: which identities are reachable right now.
//!
//! At most one connection per identity. Registering again supersedes the
//! older connection (last writer wins). Removal is conditional on the
//! connection id, so a superseded connection cleaning up after itself can
//! never evict its replacement.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tandem_protocol::IdentityId;
use tandem_transport::{Connection, ConnectionId};

/// Maps live identities to their open connection.
pub struct ConnectionRegistry<C: Connection> {
    connections: RwLock<HashMap<IdentityId, Arc<C>>>,
}

impl<C: Connection> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Maps `identity` to `conn`, returning the connection it replaced.
    pub fn register(&self, identity: IdentityId, conn: Arc<C>) -> Option<Arc<C>> {
        let previous = self.connections.write().insert(identity, conn);
        if let Some(old) = &previous {
            tracing::info!(%identity, superseded = %old.id(), "connection superseded");
        }
        previous
    }

    /// Removes `identity` unconditionally.
    pub fn unregister(&self, identity: IdentityId) -> Option<Arc<C>> {
        self.connections.write().remove(&identity)
    }

    /// Removes `identity` only if it is still mapped to `conn_id`, and
    /// returns the removed connection.
    ///
    /// Returns `None` when the mapping is gone or belongs to a newer
    /// connection.
    pub fn unregister_if(&self, identity: IdentityId, conn_id: ConnectionId) -> Option<Arc<C>> {
        let mut connections = self.connections.write();
        let current = connections
            .get(&identity)
            .is_some_and(|conn| conn.id() == conn_id);
        if current {
            connections.remove(&identity)
        } else {
            None
        }
    }

    pub fn lookup(&self, identity: IdentityId) -> Option<Arc<C>> {
        self.connections.read().get(&identity).cloned()
    }

    pub fn is_live(&self, identity: IdentityId) -> bool {
        self.connections.read().contains_key(&identity)
    }

    /// Returns `true` if `conn_id` is the connection `identity` is
    /// registered with.
    pub fn is_current(&self, identity: IdentityId, conn_id: ConnectionId) -> bool {
        self.connections
            .read()
            .get(&identity)
            .is_some_and(|conn| conn.id() == conn_id)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
