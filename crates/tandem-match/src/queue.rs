//! The matchmaking queue: identities waiting for a partner.
//!
//! Not thread-safe on its own; [`Matchmaker`](crate::Matchmaker) owns it
//! behind a lock.

use std::collections::HashMap;
use std::time::Instant;

use tandem_identity::Identity;
use tandem_protocol::IdentityId;

use crate::{MatchError, scoring};

/// A waiting identity's matchmaking snapshot.
///
/// The profile is copied at join time, so edits made while waiting only
/// take effect on the next join.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub identity: Identity,
    pub enqueued_at: Instant,
    /// Insertion counter. Breaks ties between equal `enqueued_at`
    /// readings on coarse clocks.
    seq: u64,
}

impl QueueEntry {
    fn age_key(&self) -> (Instant, u64) {
        (self.enqueued_at, self.seq)
    }
}

/// A candidate's best available partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestMatch {
    pub partner: IdentityId,
    pub score: usize,
}

/// Waiting identities, keyed by id.
#[derive(Debug, Default)]
pub struct MatchQueue {
    entries: HashMap<IdentityId, QueueEntry>,
    next_seq: u64,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity and returns its 1-based position.
    ///
    /// # Errors
    /// Returns [`MatchError::AlreadyQueued`] if an entry already exists.
    pub fn insert(&mut self, identity: Identity, now: Instant) -> Result<usize, MatchError> {
        let id = identity.id;
        if self.entries.contains_key(&id) {
            return Err(MatchError::AlreadyQueued(id));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id,
            QueueEntry {
                identity,
                enqueued_at: now,
                seq,
            },
        );
        Ok(self.position(&id).unwrap_or(self.entries.len()))
    }

    /// Puts back an entry that was taken out, keeping its original age.
    pub(crate) fn restore(&mut self, entry: QueueEntry) {
        self.entries.entry(entry.identity.id).or_insert(entry);
    }

    /// Removes an identity's entry. Removing an absent entry is a no-op.
    pub fn remove(&mut self, id: &IdentityId) -> Option<QueueEntry> {
        self.entries.remove(id)
    }

    /// Finds the best partner for `candidate` among entries accepted by
    /// `eligible`.
    ///
    /// Only reciprocal entries are considered. The highest score wins;
    /// among equal scores the entry that has waited longest wins.
    pub fn best_match(
        &self,
        candidate: &Identity,
        eligible: impl Fn(&QueueEntry) -> bool,
    ) -> Option<BestMatch> {
        self.entries
            .values()
            .filter(|entry| entry.identity.id != candidate.id && eligible(entry))
            .filter_map(|entry| {
                scoring::score(candidate, &entry.identity).map(|score| (score, entry))
            })
            .max_by(|(score_a, a), (score_b, b)| {
                score_a
                    .cmp(score_b)
                    .then_with(|| b.age_key().cmp(&a.age_key()))
            })
            .map(|(score, entry)| BestMatch {
                partner: entry.identity.id,
                score,
            })
    }

    /// The 1-based position of an identity, oldest first.
    pub fn position(&self, id: &IdentityId) -> Option<usize> {
        let key = self.entries.get(id)?.age_key();
        Some(
            self.entries
                .values()
                .filter(|entry| entry.age_key() <= key)
                .count(),
        )
    }

    /// Removes and returns every entry enqueued before `cutoff`.
    pub fn expire_before(&mut self, cutoff: Instant) -> Vec<QueueEntry> {
        let expired: Vec<IdentityId> = self
            .entries
            .values()
            .filter(|entry| entry.enqueued_at < cutoff)
            .map(|entry| entry.identity.id)
            .collect();
        expired
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .collect()
    }

    pub fn get(&self, id: &IdentityId) -> Option<&QueueEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &IdentityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
