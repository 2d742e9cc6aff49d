//! `TandemServer` builder and server loop.
//!
//! This is the entry point for running a Tandem relay. It ties together
//! all the layers: transport → protocol → identity → match → relay.

use std::sync::Arc;

use tandem_identity::Authenticator;
use tandem_transport::{Connection, WebSocketConnection, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Relay, RelayConfig, TandemError, Translator};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Connection, A: Authenticator, T: Translator> {
    pub(crate) relay: Arc<Relay<C, T>>,
    pub(crate) auth: A,
}

/// Builder for configuring and starting a Tandem server.
///
/// # Example
///
/// ```rust,ignore
/// use tandem::prelude::*;
///
/// let server = TandemServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(my_auth, Passthrough)
///     .await?;
/// server.run().await
/// ```
pub struct TandemServerBuilder {
    bind_addr: String,
    config: RelayConfig,
}

impl TandemServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: RelayConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the relay configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build<A, T>(self, auth: A, translator: T) -> Result<TandemServer<A, T>, TandemError>
    where
        A: Authenticator,
        T: Translator,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            relay: Arc::new(Relay::new(translator, self.config)),
            auth,
        });

        Ok(TandemServer { transport, state })
    }
}

impl Default for TandemServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Tandem server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TandemServer<A: Authenticator, T: Translator> {
    transport: WebSocketTransport,
    state: Arc<ServerState<WebSocketConnection, A, T>>,
}

impl<A, T> TandemServer<A, T>
where
    A: Authenticator,
    T: Translator,
{
    /// Creates a new builder.
    pub fn builder() -> TandemServerBuilder {
        TandemServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The relay behind this server, for in-process callers such as an
    /// HTTP quick-match endpoint or a stats page.
    pub fn relay(&self) -> Arc<Relay<WebSocketConnection, T>> {
        Arc::clone(&self.state.relay)
    }

    /// Runs the server accept loop.
    ///
    /// Starts the sweeper, then accepts incoming TCP connections and
    /// spawns a task for each. The WebSocket upgrade happens on that task,
    /// so a peer that stalls its handshake never holds up other accepts.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), TandemError> {
        tracing::info!("Tandem server running");
        let _sweeper = self.state.relay.spawn_sweeper();

        loop {
            match self.transport.accept_pending().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer = pending.peer_addr();
                        let conn = match pending.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%peer, error = %e, "handshake rejected");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
