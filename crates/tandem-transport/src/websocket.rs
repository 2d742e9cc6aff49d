//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! The credential is captured during the HTTP upgrade, from either a
//! `token` query parameter or an `Authorization: Bearer` header. Upgrades
//! without one are refused with `401` before a connection exists.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::{StatusCode, header};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Upper bound on how long a peer may take to finish the upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    ///
    /// Useful after binding to port `0`.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    /// Accepts and upgrades the next connection in one step.
    ///
    /// Servers that must keep accepting while a peer dawdles over its
    /// upgrade should call [`accept_pending`](WebSocketTransport::accept_pending)
    /// and run [`PendingUpgrade::upgrade`] on a task of its own.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.accept_pending().await?.upgrade().await
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl WebSocketTransport {
    /// Accepts the next TCP connection without performing the upgrade.
    pub async fn accept_pending(&mut self) -> Result<PendingUpgrade, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingUpgrade { stream, peer })
    }
}

/// A TCP connection that has not finished its WebSocket upgrade yet.
pub struct PendingUpgrade {
    stream: TcpStream,
    peer: SocketAddr,
}

impl PendingUpgrade {
    /// Returns the remote peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Runs the WebSocket upgrade, capturing the credential.
    ///
    /// Fails with [`TransportError::HandshakeRejected`] if the peer sends
    /// no credential, a malformed request, or takes longer than the
    /// handshake timeout.
    pub async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self { stream, peer } = self;

        let mut credential = None;
        let upgrade = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request, resp: Response| {
                credential = credential_from_request(req);
                match credential {
                    Some(_) => Ok(resp),
                    None => Err(unauthorized("token_required")),
                }
            },
        );

        let ws = match tokio::time::timeout(HANDSHAKE_TIMEOUT, upgrade).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                return Err(TransportError::HandshakeRejected(e.to_string()));
            }
            Err(_) => {
                return Err(TransportError::HandshakeRejected(
                    "handshake timed out".into(),
                ));
            }
        };

        let credential = credential.ok_or_else(|| {
            TransportError::HandshakeRejected("token_required".into())
        })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            credential,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// Extracts the credential from the upgrade request.
///
/// The `token` query parameter wins over the `Authorization` header.
/// Query values are percent-decoded.
fn credential_from_request(req: &Request) -> Option<String> {
    let from_query = req.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key != "token" {
                return None;
            }
            let value = urlencoding::decode(value).ok()?;
            (!value.is_empty()).then(|| value.into_owned())
        })
    });

    from_query.or_else(|| {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

fn unauthorized(reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}

/// A single WebSocket connection.
///
/// The socket is split so a write from another task never queues
/// behind the owning task's pending read.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    credential: String,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// Returns the remote peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn credential(&self) -> Option<&str> {
        Some(&self.credential)
    }
}
