//! Anonymous identities for Tandem.
//!
//! This crate answers "who is this participant?":
//!
//! 1. **Authentication**: turning a credential into an [`Identity`]
//!    ([`Authenticator`] trait)
//! 2. **Profiles**: the languages, interests and region matchmaking reads
//!    ([`Identity`], [`ProfileUpdate`], [`IdentityStore`])
//! 3. **Issuance**: handing out anonymous credentials
//!    ([`AnonymousIssuer`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Match Layer (above)     ← pairs identities by language and interests
//!     ↕
//! Identity Layer (this)   ← who a participant is and what they want
//!     ↕
//! Protocol Layer (below)  ← provides IdentityId
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod identity;
mod issuer;
mod store;

pub use auth::Authenticator;
pub use error::IdentityError;
pub use identity::{
    DEFAULT_NATIVE_LANGUAGE, DEFAULT_REGION, DEFAULT_TARGET_LANGUAGE, Identity,
    ProfileLimits, ProfileUpdate, sanitize_text,
};
pub use issuer::{AnonymousIssuer, IssueRequest, Issued};
pub use store::IdentityStore;
