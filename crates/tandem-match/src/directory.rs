//! The session directory: every active two-party session.

use std::collections::HashMap;
use std::time::Instant;

use tandem_protocol::{IdentityId, SessionId};

use crate::MatchError;

/// An active pairing of exactly two distinct identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub members: [IdentityId; 2],
    pub created_at: Instant,
}

impl Session {
    /// Returns the other member, or `None` if `member` isn't in this
    /// session.
    pub fn partner_of(&self, member: IdentityId) -> Option<IdentityId> {
        match self.members {
            [a, b] if a == member => Some(b),
            [a, b] if b == member => Some(a),
            _ => None,
        }
    }
}

/// Active sessions plus a member → session index.
///
/// The index is updated in the same call as the session map, so the two
/// never disagree.
#[derive(Debug)]
pub struct SessionDirectory {
    sessions: HashMap<SessionId, Session>,
    by_member: HashMap<IdentityId, SessionId>,
    next_id: u64,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            by_member: HashMap::new(),
            next_id: 1,
        }
    }

    /// Pairs two identities in a new session.
    ///
    /// # Errors
    /// - [`MatchError::SameIdentity`] if `a == b`
    /// - [`MatchError::AlreadyInSession`] if either already has a session
    pub fn create(
        &mut self,
        a: IdentityId,
        b: IdentityId,
        now: Instant,
    ) -> Result<&Session, MatchError> {
        if a == b {
            return Err(MatchError::SameIdentity(a));
        }
        if let Some(busy) = [a, b].into_iter().find(|id| self.by_member.contains_key(id)) {
            return Err(MatchError::AlreadyInSession(busy));
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.by_member.insert(a, id);
        self.by_member.insert(b, id);
        tracing::info!(session_id = %id, member_a = %a, member_b = %b, "session created");

        Ok(self.sessions.entry(id).or_insert(Session {
            id,
            members: [a, b],
            created_at: now,
        }))
    }

    pub fn find_by_member(&self, member: &IdentityId) -> Option<&Session> {
        self.by_member
            .get(member)
            .and_then(|id| self.sessions.get(id))
    }

    pub fn partner_of(&self, member: IdentityId) -> Option<IdentityId> {
        self.find_by_member(&member)?.partner_of(member)
    }

    pub fn contains_member(&self, member: &IdentityId) -> bool {
        self.by_member.contains_key(member)
    }

    /// Removes `member`'s session and returns it. Absent ⇒ no-op.
    pub fn teardown(&mut self, member: IdentityId) -> Option<Session> {
        let id = self.by_member.get(&member).copied()?;
        self.remove(id)
    }

    /// Removes and returns every session created before `cutoff`.
    pub fn expire_before(&mut self, cutoff: Instant) -> Vec<Session> {
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|session| session.created_at < cutoff)
            .map(|session| session.id)
            .collect();
        expired.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    fn remove(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        for member in session.members {
            self.by_member.remove(&member);
        }
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn uid(id: u64) -> IdentityId {
        IdentityId(id)
    }

    #[test]
    fn test_create_indexes_both_members() {
        let mut dir = SessionDirectory::new();
        let session_id = dir.create(uid(1), uid(2), Instant::now()).unwrap().id;

        assert_eq!(dir.find_by_member(&uid(1)).map(|s| s.id), Some(session_id));
        assert_eq!(dir.find_by_member(&uid(2)).map(|s| s.id), Some(session_id));
        assert_eq!(dir.partner_of(uid(1)), Some(uid(2)));
        assert_eq!(dir.partner_of(uid(2)), Some(uid(1)));
    }

    #[test]
    fn test_create_same_identity_is_rejected() {
        let mut dir = SessionDirectory::new();
        let result = dir.create(uid(1), uid(1), Instant::now());
        assert_eq!(result.unwrap_err(), MatchError::SameIdentity(uid(1)));
        assert!(dir.is_empty());
    }

    #[test]
    fn test_create_busy_member_is_rejected_without_overwrite() {
        let mut dir = SessionDirectory::new();
        let original = dir.create(uid(1), uid(2), Instant::now()).unwrap().id;

        let result = dir.create(uid(3), uid(2), Instant::now());
        assert_eq!(result.unwrap_err(), MatchError::AlreadyInSession(uid(2)));
        assert_eq!(dir.find_by_member(&uid(2)).map(|s| s.id), Some(original));
        assert!(!dir.contains_member(&uid(3)));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_teardown_removes_session_and_index() {
        let mut dir = SessionDirectory::new();
        dir.create(uid(1), uid(2), Instant::now()).unwrap();

        let session = dir.teardown(uid(2)).unwrap();
        assert_eq!(session.partner_of(uid(2)), Some(uid(1)));
        assert!(dir.is_empty());
        assert!(!dir.contains_member(&uid(1)));
        assert!(!dir.contains_member(&uid(2)));
    }

    #[test]
    fn test_teardown_twice_is_noop() {
        let mut dir = SessionDirectory::new();
        dir.create(uid(1), uid(2), Instant::now()).unwrap();

        assert!(dir.teardown(uid(1)).is_some());
        assert!(dir.teardown(uid(1)).is_none());
        assert!(dir.teardown(uid(2)).is_none());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let mut dir = SessionDirectory::new();
        let a = dir.create(uid(1), uid(2), Instant::now()).unwrap().id;
        let b = dir.create(uid(3), uid(4), Instant::now()).unwrap().id;
        assert_ne!(a, b);
    }

    #[test]
    fn test_expire_before_removes_old_sessions() {
        let mut dir = SessionDirectory::new();
        let now = Instant::now();
        dir.create(uid(1), uid(2), now).unwrap();
        dir.create(uid(3), uid(4), now + Duration::from_secs(60)).unwrap();

        let expired = dir.expire_before(now + Duration::from_secs(30));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].members, [uid(1), uid(2)]);
        assert!(dir.contains_member(&uid(3)));
        assert!(!dir.contains_member(&uid(1)));
    }

    #[test]
    fn test_partner_of_non_member_is_none() {
        let session = Session {
            id: SessionId(1),
            members: [uid(1), uid(2)],
            created_at: Instant::now(),
        };
        assert_eq!(session.partner_of(uid(3)), None);
    }
}
