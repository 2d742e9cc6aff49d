//! Transport abstraction layer for Tandem.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the duplex byte channel a participant holds open for the lifetime of
//! their visit. The relay engine only ever talks to a [`Connection`], which
//! keeps it testable against in-memory connections.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingUpgrade, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
///
/// Distinct from the identity on the other end: one identity may open
/// several connections over time, and only the newest is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that can send and receive bytes.
///
/// The futures are required to be `Send` so that code generic over the
/// connection type can still be spawned onto the multi-threaded runtime.
/// Implementations are free to use `async fn`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends data to the remote peer.
    ///
    /// Must not wait on a concurrent [`recv`](Self::recv): pushes from
    /// other tasks arrive while the owning task is parked on a read.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the credential presented when the connection was opened,
    /// if the transport captures one.
    fn credential(&self) -> Option<&str> {
        None
    }
}
