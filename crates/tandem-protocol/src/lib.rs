//! Wire protocol for Tandem.
//!
//! This crate defines the "language" that browsers and the relay speak:
//!
//! - **Identifiers** ([`IdentityId`], [`SessionId`], [`ReportId`]).
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): what travels inside
//!   each `{type, payload}` frame.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about queues or sessions; it only
//! knows how to read and write frames.
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Relay (queue, sessions)
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{
    ChatDelivery, ChatText, ClientEvent, Frame, JoinQueue, MatchFound,
    ReportUser, ServerEvent, UpdateInterests, UpdateLanguages,
};
pub use types::{IdentityId, ReportId, SessionId};
