//! Relay configuration.

use std::time::Duration;

use tandem_identity::ProfileLimits;
use tandem_match::MatchConfig;

/// Timeouts and limits for the relay.
///
/// Start from `RelayConfig::default()` and override the fields you care
/// about.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// A connection that sends nothing for this long is closed.
    /// Clients keep it open with `ping`. Default: 45 seconds.
    pub idle_timeout: Duration,

    /// Upper bound on a single push. A push that doesn't finish in time
    /// counts as a write failure. Default: 5 seconds.
    pub write_timeout: Duration,

    /// Upper bound on a translation call before the original text is
    /// delivered instead. Default: 3 seconds.
    pub translation_timeout: Duration,

    /// How often queue timeouts and session expiry are applied.
    /// `Duration::ZERO` disables the sweeper. Default: 30 seconds.
    pub sweep_interval: Duration,

    /// Chat messages are cut to this many characters. Default: 1000.
    pub max_message_chars: usize,

    pub profile: ProfileLimits,

    pub matching: MatchConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(45),
            write_timeout: Duration::from_secs(5),
            translation_timeout: Duration::from_secs(3),
            sweep_interval: Duration::from_secs(30),
            max_message_chars: 1000,
            profile: ProfileLimits::default(),
            matching: MatchConfig::default(),
        }
    }
}
