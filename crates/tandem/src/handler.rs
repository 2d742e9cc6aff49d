//! Per-connection handler: authentication and event routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Authenticate the credential captured at handshake → `Identity`
//!      (on failure: send a 401 `error` frame and close)
//!   2. Register with the relay → `connected` welcome
//!   3. Loop: receive frames → decode → dispatch to the relay
//!   4. On close, read error, or idle timeout → full cleanup
//!
//! Events from one connection are dispatched strictly in arrival order,
//! because the loop awaits each dispatch before reading the next frame.

use std::sync::Arc;

use tandem_identity::{Authenticator, IdentityError};
use tandem_protocol::{ClientEvent, Codec, IdentityId, JsonCodec, ServerEvent};
use tandem_transport::{Connection, ConnectionId};

use crate::server::ServerState;
use crate::{Relay, TandemError, Translator};

/// Drop guard that runs the relay's cleanup when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async part.
struct ConnectionGuard<C: Connection, T: Translator> {
    identity: IdentityId,
    conn_id: ConnectionId,
    relay: Arc<Relay<C, T>>,
}

impl<C: Connection, T: Translator> Drop for ConnectionGuard<C, T> {
    fn drop(&mut self) {
        let identity = self.identity;
        let conn_id = self.conn_id;
        let relay = Arc::clone(&self.relay);
        tokio::spawn(async move {
            relay.disconnect(identity, conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, A, T>(
    conn: C,
    state: Arc<ServerState<C, A, T>>,
) -> Result<(), TandemError>
where
    C: Connection,
    A: Authenticator,
    T: Translator,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Authenticate ---
    let credential = conn.credential().unwrap_or("").to_string();
    let identity = match state.auth.authenticate(&credential).await {
        Ok(identity) => identity,
        Err(e) => {
            reject(&conn, &e).await;
            return Err(TandemError::Identity(e));
        }
    };

    // --- Step 2: Register ---
    let relay = Arc::clone(&state.relay);
    let conn = Arc::new(conn);
    let identity = relay.connect(identity, Arc::clone(&conn)).await;
    let identity_id = identity.id;
    let _guard = ConnectionGuard {
        identity: identity_id,
        conn_id,
        relay: Arc::clone(&relay),
    };

    // --- Step 3: Event loop ---
    let idle_timeout = relay.config().idle_timeout;
    loop {
        let data = match tokio::time::timeout(idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(identity = %identity_id, %conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(identity = %identity_id, %conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(identity = %identity_id, %conn_id, "connection idle, closing");
                break;
            }
        };

        // A newer connection took over this identity.
        if !relay.is_current(identity_id, conn_id) {
            tracing::debug!(identity = %identity_id, %conn_id, "superseded, stopping reads");
            break;
        }

        match ClientEvent::decode(&JsonCodec, &data) {
            Ok(Some(event)) => relay.dispatch(identity_id, event).await,
            Ok(None) => {
                tracing::debug!(identity = %identity_id, "ignoring unknown event type");
            }
            Err(e) => {
                tracing::debug!(identity = %identity_id, error = %e, "discarding malformed frame");
            }
        }
    }

    // _guard drops here → cleanup fires.
    Ok(())
}

/// Tells the client why it was refused, then closes.
async fn reject<C: Connection>(conn: &C, error: &IdentityError) {
    tracing::info!(conn_id = %conn.id(), reason = error.code(), "authentication failed");
    let refusal = ServerEvent::Error {
        code: 401,
        message: error.code().to_string(),
    };
    if let Ok(bytes) = JsonCodec.encode(&refusal) {
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "failed to send refusal");
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
    }
}
