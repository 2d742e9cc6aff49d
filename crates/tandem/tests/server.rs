//! Integration tests for the Tandem server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tandem::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Mock authenticator
// =========================================================================

/// Accepts credentials of the form `<id>.<native>.<target>`.
struct TestAuth;

impl Authenticator for TestAuth {
    async fn authenticate(&self, credential: &str) -> Result<Identity, IdentityError> {
        let mut parts = credential.split('.');
        let id: u64 = parts
            .next()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| IdentityError::InvalidCredential("not a number".into()))?;
        let native = parts.next().unwrap_or("pt");
        let target = parts.next().unwrap_or("en");
        Ok(Identity::new(IdentityId(id), format!("Guest{id}")).with_languages(native, target))
    }
}

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = TandemServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(TestAuth, Passthrough)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str, token: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/?token={token}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, json: &str) {
    ws.send(Message::text(json)).await.expect("send");
}

/// Waits for the next event, skipping control frames.
async fn recv(ws: &mut ClientWs) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("recv failed");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("decode");
        }
    }
}

/// Connects and consumes the welcome.
async fn connect_ready(addr: &str, token: &str) -> ClientWs {
    let mut ws = connect(addr, token).await;
    match recv(&mut ws).await {
        ServerEvent::Connected { .. } => ws,
        other => panic!("expected connected, got {other:?}"),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_connect_receives_welcome() {
    let addr = start_server().await;
    let mut ws = connect(&addr, "42.es.en").await;

    match recv(&mut ws).await {
        ServerEvent::Connected {
            identity_id, alias, ..
        } => {
            assert_eq!(identity_id, IdentityId(42));
            assert_eq!(alias, "Guest42");
        }
        other => panic!("expected connected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_credential_is_refused() {
    let addr = start_server().await;
    let mut ws = connect(&addr, "nope").await;

    match recv(&mut ws).await {
        ServerEvent::Error { code, message } => {
            assert_eq!(code, 401);
            assert_eq!(message, "invalid_token");
        }
        other => panic!("expected error, got {other:?}"),
    }

    // Then the server closes.
    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("should close promptly");
    match next {
        None | Some(Err(_)) => {}
        Some(Ok(msg)) => assert!(msg.is_close(), "expected close, got {msg:?}"),
    }
}

#[tokio::test]
async fn test_missing_credential_fails_upgrade() {
    let addr = start_server().await;
    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_two_clients_match_and_chat() {
    let addr = start_server().await;
    let mut ana = connect_ready(&addr, "1.es.en").await;
    let mut ben = connect_ready(&addr, "2.en.es").await;

    send(&mut ana, r#"{"type":"join_queue","payload":{"interests":["music"]}}"#).await;
    assert_eq!(recv(&mut ana).await, ServerEvent::QueueJoined { position: 1 });

    send(&mut ben, r#"{"type":"join_queue","payload":{"interests":["music"]}}"#).await;
    let ServerEvent::MatchFound(to_ben) = recv(&mut ben).await else {
        panic!("expected match_found for ben");
    };
    let ServerEvent::MatchFound(to_ana) = recv(&mut ana).await else {
        panic!("expected match_found for ana");
    };
    assert_eq!(to_ana.session_id, to_ben.session_id);
    assert_eq!(to_ana.shared_interests, vec!["music"]);

    send(&mut ana, r#"{"type":"chat_message","payload":{"message":"hola"}}"#).await;
    let ServerEvent::ChatMessage(delivery) = recv(&mut ben).await else {
        panic!("expected chat_message");
    };
    assert_eq!(delivery.text, "hola");
    assert_eq!(delivery.from, "Guest1");
    assert!(matches!(recv(&mut ana).await, ServerEvent::ChatSent(_)));
}

#[tokio::test]
async fn test_disconnect_notifies_partner() {
    let addr = start_server().await;
    let mut ana = connect_ready(&addr, "11.es.en").await;
    let mut ben = connect_ready(&addr, "12.en.es").await;

    send(&mut ana, r#"{"type":"join_queue"}"#).await;
    recv(&mut ana).await;
    send(&mut ben, r#"{"type":"join_queue"}"#).await;
    recv(&mut ben).await;
    recv(&mut ana).await;

    ben.close(None).await.expect("close");
    assert_eq!(recv(&mut ana).await, ServerEvent::PartnerLeft);
}

#[tokio::test]
async fn test_malformed_and_unknown_frames_are_ignored() {
    let addr = start_server().await;
    let mut ws = connect_ready(&addr, "21").await;

    send(&mut ws, "this is not json").await;
    send(&mut ws, r#"{"payload":{}}"#).await;
    send(&mut ws, r#"{"type":"teleport"}"#).await;
    send(&mut ws, r#"{"type":"ping"}"#).await;

    assert!(matches!(recv(&mut ws).await, ServerEvent::Pong { .. }));
}

#[tokio::test]
async fn test_reconnect_supersedes_old_connection() {
    let addr = start_server().await;
    let mut old = connect_ready(&addr, "31").await;
    let mut new = connect_ready(&addr, "31").await;

    // The old socket is closed by the server.
    let next = tokio::time::timeout(Duration::from_secs(2), old.next())
        .await
        .expect("old connection should close");
    match next {
        None | Some(Err(_)) => {}
        Some(Ok(msg)) => assert!(msg.is_close(), "expected close, got {msg:?}"),
    }

    send(&mut new, r#"{"type":"ping"}"#).await;
    assert!(matches!(recv(&mut new).await, ServerEvent::Pong { online: 1, .. }));
}

#[tokio::test]
async fn test_stalled_handshake_does_not_block_other_clients() {
    let addr = start_server().await;

    // A peer that opens TCP and never sends the upgrade request.
    let _idle = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("tcp connect");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let connected = tokio::time::timeout(
        Duration::from_secs(2),
        tokio_tungstenite::connect_async(format!("ws://{addr}/?token=7.es.en")),
    )
    .await
    .expect("an honest client must not wait behind a stalled handshake");
    let (mut ws, _) = connected.expect("should connect");
    assert!(matches!(recv(&mut ws).await, ServerEvent::Connected { .. }));
}

#[tokio::test]
async fn test_percent_encoded_token_reaches_authenticator() {
    let addr = start_server().await;
    // "%2E" decodes to the "." separator TestAuth splits on.
    let mut ws = connect(&addr, "51%2Ees%2Een").await;

    match recv(&mut ws).await {
        ServerEvent::Connected { identity_id, .. } => assert_eq!(identity_id, IdentityId(51)),
        other => panic!("expected connected, got {other:?}"),
    }
}
