//! The matchmaker: queue and directory behind their locks.
//!
//! # Lock order
//!
//! Operations that touch both structures always take the queue lock
//! before the directory lock. Callers that also consult connection state
//! do so through the `is_live` predicate, which runs while both locks are
//! held, so the global order is queue → directory → registry. Every
//! method is synchronous and no lock outlives the call.

use std::time::Instant;

use parking_lot::RwLock;
use tandem_identity::Identity;
use tandem_protocol::{IdentityId, MatchFound, SessionId};

use crate::{
    MatchConfig, MatchError, MatchQueue, QueueEntry, Session, SessionDirectory, scoring,
};

/// Where an identity currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Idle,
    Queued,
    InSession(SessionId),
}

/// A freshly created session, seen from both sides.
#[derive(Debug, Clone)]
pub struct Pairing {
    pub session_id: SessionId,
    /// The identity whose join completed the match.
    pub candidate: Identity,
    /// The identity that was waiting in the queue.
    pub partner: Identity,
    pub shared_interests: Vec<String>,
    pub score: usize,
}

impl Pairing {
    /// The descriptor pushed to the candidate (describes the partner).
    pub fn for_candidate(&self) -> MatchFound {
        self.describe(&self.partner, true)
    }

    /// The descriptor pushed to the waiting partner (describes the
    /// candidate).
    pub fn for_partner(&self) -> MatchFound {
        self.describe(&self.candidate, false)
    }

    fn describe(&self, other: &Identity, initiator: bool) -> MatchFound {
        MatchFound {
            session_id: self.session_id,
            partner_alias: other.alias.clone(),
            partner_language: other.native_language.clone(),
            partner_region: other.region.clone(),
            shared_interests: self.shared_interests.clone(),
            initiator,
        }
    }
}

/// The result of a successful join.
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Matched(Pairing),
    Queued { position: usize },
}

/// A removed session and the member left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Teardown {
    pub session_id: SessionId,
    pub partner: IdentityId,
}

/// Everything a sweep removed.
#[derive(Debug, Default)]
pub struct Sweep {
    pub timed_out: Vec<IdentityId>,
    pub expired: Vec<Session>,
}

/// Owns the queue and the session directory.
pub struct Matchmaker {
    queue: RwLock<MatchQueue>,
    directory: RwLock<SessionDirectory>,
    config: MatchConfig,
}

impl Matchmaker {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            queue: RwLock::new(MatchQueue::new()),
            directory: RwLock::new(SessionDirectory::new()),
            config,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Enqueues `identity`, pairing it immediately if a partner waits.
    ///
    /// The whole check-then-mutate sequence runs under both write locks,
    /// so two concurrent joins can never claim the same queued entry.
    /// `is_live` reports whether an identity still has a connection:
    /// queued entries that fail it are passed over, and a session whose
    /// partner fails it is treated as already over.
    ///
    /// # Errors
    /// - [`MatchError::AlreadyQueued`] if `identity` is waiting
    /// - [`MatchError::AlreadyInSession`] if `identity` has a live session
    pub fn join(
        &self,
        identity: Identity,
        is_live: impl Fn(IdentityId) -> bool,
    ) -> Result<JoinOutcome, MatchError> {
        let now = Instant::now();
        let mut queue = self.queue.write();
        let mut directory = self.directory.write();
        let id = identity.id;

        if queue.contains(&id) {
            return Err(MatchError::AlreadyQueued(id));
        }
        if let Some(partner) = directory.partner_of(id) {
            if is_live(partner) {
                return Err(MatchError::AlreadyInSession(id));
            }
            if let Some(stale) = directory.teardown(id) {
                tracing::info!(
                    identity = %id,
                    session_id = %stale.id,
                    "dropped session with departed partner"
                );
            }
        }

        let best = queue.best_match(&identity, |entry| is_live(entry.identity.id));
        let Some((best, entry)) =
            best.and_then(|best| queue.remove(&best.partner).map(|entry| (best, entry)))
        else {
            let position = queue.insert(identity, now)?;
            tracing::debug!(identity = %id, position, "queued");
            return Ok(JoinOutcome::Queued { position });
        };

        let session_id = match directory.create(id, entry.identity.id, now) {
            Ok(session) => session.id,
            Err(e) => {
                queue.restore(entry);
                return Err(e);
            }
        };

        let QueueEntry {
            identity: partner, ..
        } = entry;
        let shared_interests = scoring::shared_interests(&identity, &partner);
        tracing::info!(
            %session_id,
            candidate = %id,
            partner = %partner.id,
            score = best.score,
            "matched"
        );

        Ok(JoinOutcome::Matched(Pairing {
            session_id,
            candidate: identity,
            partner,
            shared_interests,
            score: best.score,
        }))
    }

    /// Removes `id` from the queue. Returns `false` if it wasn't queued.
    pub fn leave_queue(&self, id: IdentityId) -> bool {
        self.queue.write().remove(&id).is_some()
    }

    /// Ends `id`'s session. Returns `None` if it had none.
    pub fn leave_session(&self, id: IdentityId) -> Option<Teardown> {
        let session = self.directory.write().teardown(id)?;
        Self::teardown_of(&session, id)
    }

    /// Full cleanup for an identity that went away: dequeue, then
    /// teardown. Both steps are idempotent.
    pub fn disconnect(&self, id: IdentityId) -> Option<Teardown> {
        let mut queue = self.queue.write();
        let mut directory = self.directory.write();
        queue.remove(&id);
        let session = directory.teardown(id)?;
        Self::teardown_of(&session, id)
    }

    fn teardown_of(session: &Session, id: IdentityId) -> Option<Teardown> {
        let partner = session.partner_of(id)?;
        tracing::info!(session_id = %session.id, left = %id, %partner, "session ended");
        Some(Teardown {
            session_id: session.id,
            partner,
        })
    }

    pub fn partner_of(&self, id: IdentityId) -> Option<IdentityId> {
        self.directory.read().partner_of(id)
    }

    pub fn session_of(&self, id: IdentityId) -> Option<Session> {
        self.directory.read().find_by_member(&id).cloned()
    }

    pub fn presence(&self, id: IdentityId) -> Presence {
        let queue = self.queue.read();
        let directory = self.directory.read();
        if let Some(session) = directory.find_by_member(&id) {
            Presence::InSession(session.id)
        } else if queue.contains(&id) {
            Presence::Queued
        } else {
            Presence::Idle
        }
    }

    pub fn queue_position(&self, id: IdentityId) -> Option<usize> {
        self.queue.read().position(&id)
    }

    /// Applies the queue timeout and session time-to-live as of now.
    pub fn sweep(&self) -> Sweep {
        self.sweep_at(Instant::now())
    }

    /// Applies the queue timeout and session time-to-live as of `now`.
    pub fn sweep_at(&self, now: Instant) -> Sweep {
        let mut queue = self.queue.write();
        let mut directory = self.directory.write();
        let mut sweep = Sweep::default();

        if let Some(cutoff) = self.config.queue_timeout.and_then(|t| now.checked_sub(t)) {
            sweep.timed_out = queue
                .expire_before(cutoff)
                .into_iter()
                .map(|entry| entry.identity.id)
                .collect();
        }
        if let Some(cutoff) = self.config.session_ttl.and_then(|t| now.checked_sub(t)) {
            sweep.expired = directory.expire_before(cutoff);
        }

        if !sweep.timed_out.is_empty() || !sweep.expired.is_empty() {
            tracing::info!(
                timed_out = sweep.timed_out.len(),
                expired = sweep.expired.len(),
                "sweep"
            );
        }
        sweep
    }

    pub fn queue_len(&self) -> usize {
        self.queue.read().len()
    }

    pub fn session_count(&self) -> usize {
        self.directory.read().len()
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}
