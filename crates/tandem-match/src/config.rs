//! Matchmaking configuration.

use std::time::Duration;

/// Timeouts applied by [`Matchmaker::sweep`](crate::Matchmaker::sweep).
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// How long an identity may wait in the queue before it is removed.
    ///
    /// Default: 120 seconds. `None` lets entries wait forever.
    pub queue_timeout: Option<Duration>,

    /// How long a session may last before it is closed.
    ///
    /// Default: 30 minutes. `None` lets sessions run until a member
    /// leaves.
    pub session_ttl: Option<Duration>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            queue_timeout: Some(Duration::from_secs(120)),
            session_ttl: Some(Duration::from_secs(30 * 60)),
        }
    }
}
