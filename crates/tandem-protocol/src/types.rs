//! Identifier types shared by every layer.
//!
//! Each identifier is a newtype over `u64`: the compiler refuses to mix an
//! identity up with a session, and `#[serde(transparent)]` keeps the wire
//! representation a plain number.

use serde::{Deserialize, Serialize};

use std::fmt;

/// A unique identifier for an anonymous participant.
///
/// Assigned once by the authenticator and stable for the lifetime of the
/// process, across reconnects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IdentityId(pub u64);

/// Prints as `U-42`, which keeps log lines greppable.
impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for a two-party session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A unique identifier for a submitted abuse report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RP-{}", self.0)
    }
}
