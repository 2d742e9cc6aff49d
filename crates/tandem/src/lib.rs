//! # Tandem
//!
//! Anonymous language-exchange matchmaking and real-time relay.
//!
//! Participants connect over WebSockets, join a queue with the language
//! they speak and the one they're learning, and get paired with someone
//! whose languages mirror theirs. Shared interests break ties. Once
//! paired, chat lines are relayed, with a translation into the
//! partner's language when a [`Translator`] is available.
//!
//! ## Layers
//!
//! ```text
//! tandem-transport  ← WebSocket connections, credential capture
//! tandem-protocol   ← {type, payload} frames, ClientEvent / ServerEvent
//! tandem-identity   ← anonymous identities and profiles
//! tandem-match      ← queue, scoring, session directory
//! tandem (this)     ← connection registry, relay engine, server loop
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tandem::prelude::*;
//!
//! # async fn run() -> Result<(), TandemError> {
//! let server = TandemServer::<AnonymousIssuer, Passthrough>::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(AnonymousIssuer::default(), Passthrough)
//!     .await?;
//! server.run().await
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod handler;
mod registry;
mod relay;
mod report;
mod server;
mod translate;

pub use config::RelayConfig;
pub use error::TandemError;
pub use registry::ConnectionRegistry;
pub use relay::{QuickMatch, Relay, RelayStats};
pub use report::{Report, ReportLog};
pub use server::{TandemServer, TandemServerBuilder};
pub use translate::{AUTO_DETECT, Passthrough, TranslateError, Translator, translate_or_original};

/// Everything needed to run a server or drive a relay in-process.
pub mod prelude {
    pub use crate::{
        ConnectionRegistry, Passthrough, QuickMatch, Relay, RelayConfig, RelayStats, Report,
        ReportLog, TandemError, TandemServer, TandemServerBuilder, TranslateError, Translator,
    };

    pub use tandem_identity::{
        AnonymousIssuer, Authenticator, Identity, IdentityError, IssueRequest, Issued,
        ProfileLimits, ProfileUpdate,
    };
    pub use tandem_match::{MatchConfig, MatchError, Presence};
    pub use tandem_protocol::{
        ClientEvent, Codec, IdentityId, JsonCodec, MatchFound, ServerEvent, SessionId,
    };
    pub use tandem_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};
}
