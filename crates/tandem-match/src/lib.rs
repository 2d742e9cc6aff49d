//! Matchmaking for Tandem.
//!
//! Pairs waiting participants whose languages mirror each other and keeps
//! track of the resulting two-party sessions.
//!
//! # Key types
//!
//! - [`Matchmaker`]: the facade the relay talks to; owns the locks
//! - [`MatchQueue`]: identities waiting for a partner
//! - [`SessionDirectory`]: active sessions, indexed by member
//! - [`scoring`]: reciprocity and interest scoring
//! - [`MatchConfig`]: queue timeout and session time-to-live

mod config;
mod directory;
mod error;
mod matchmaker;
mod queue;
pub mod scoring;

pub use config::MatchConfig;
pub use directory::{Session, SessionDirectory};
pub use error::MatchError;
pub use matchmaker::{JoinOutcome, Matchmaker, Pairing, Presence, Sweep, Teardown};
pub use queue::{BestMatch, MatchQueue, QueueEntry};
