//! Events exchanged over a Tandem connection.
//!
//! Every frame on the wire is a JSON object with a required `type` string
//! and an optional `payload` object:
//!
//! ```json
//! { "type": "chat_message", "payload": { "text": "hola" } }
//! ```
//!
//! Inbound frames are decoded in two steps. First into a loose [`Frame`],
//! which only checks that `type` exists. Then [`ClientEvent::from_frame`]
//! looks the tag up. That split lets the server tell a malformed frame
//! (dropped) apart from a well-formed frame of a type it doesn't know
//! (ignored), without closing the connection in either case.
//!
//! Outbound [`ServerEvent`]s are adjacently tagged, so they produce the
//! same `{type, payload}` shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Codec, IdentityId, ProtocolError, ReportId, SessionId};

// ---------------------------------------------------------------------------
// Frame: the loose envelope
// ---------------------------------------------------------------------------

/// A decoded-but-not-interpreted inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The event tag, e.g. `"join_queue"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The event body. Missing payloads decode as `null`.
    #[serde(default)]
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

/// Optional profile overrides carried by `join_queue`.
///
/// Fields left out keep whatever the participant's profile already says.
/// camelCase aliases are accepted for browser clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinQueue {
    #[serde(alias = "nativeLanguage")]
    pub native_language: Option<String>,
    #[serde(alias = "targetLanguage")]
    pub target_language: Option<String>,
    pub interests: Option<Vec<String>>,
    #[serde(alias = "country")]
    pub region: Option<String>,
}

/// A chat line. Older clients send it as `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatText {
    #[serde(alias = "message")]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateLanguages {
    #[serde(alias = "nativeLanguage")]
    pub native_language: Option<String>,
    #[serde(alias = "targetLanguage")]
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateInterests {
    pub interests: Vec<String>,
}

/// Why a participant reported their partner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportUser {
    pub reason: String,
    pub details: String,
}

// ---------------------------------------------------------------------------
// ClientEvent: client → server
// ---------------------------------------------------------------------------

/// Every event a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    JoinQueue(JoinQueue),
    LeaveQueue,
    ChatMessage(ChatText),
    Typing,
    StopTyping,
    UpdateLanguages(UpdateLanguages),
    UpdateInterests(UpdateInterests),
    ReportUser(ReportUser),
    BlockUser,
    LeaveRoom,
    Ping,
}

impl ClientEvent {
    /// Interprets a frame.
    ///
    /// Returns `Ok(None)` for an unknown `type`, and an error when the
    /// type is known but the payload has the wrong shape.
    pub fn from_frame(frame: Frame) -> Result<Option<Self>, ProtocolError> {
        let Frame { kind, payload } = frame;
        let event = match kind.as_str() {
            "join_queue" => Self::JoinQueue(payload_as(payload)?),
            "leave_queue" => Self::LeaveQueue,
            "chat_message" => Self::ChatMessage(payload_as(payload)?),
            "typing" => Self::Typing,
            "stop_typing" => Self::StopTyping,
            "update_languages" => Self::UpdateLanguages(payload_as(payload)?),
            "update_interests" => Self::UpdateInterests(payload_as(payload)?),
            "report_user" => Self::ReportUser(payload_as(payload)?),
            "block_user" => Self::BlockUser,
            "leave_room" => Self::LeaveRoom,
            "ping" => Self::Ping,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Decodes raw bytes straight into an event.
    pub fn decode(
        codec: &impl Codec,
        data: &[u8],
    ) -> Result<Option<Self>, ProtocolError> {
        let frame: Frame = codec.decode(data)?;
        Self::from_frame(frame)
    }

    /// The wire tag of this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinQueue(_) => "join_queue",
            Self::LeaveQueue => "leave_queue",
            Self::ChatMessage(_) => "chat_message",
            Self::Typing => "typing",
            Self::StopTyping => "stop_typing",
            Self::UpdateLanguages(_) => "update_languages",
            Self::UpdateInterests(_) => "update_interests",
            Self::ReportUser(_) => "report_user",
            Self::BlockUser => "block_user",
            Self::LeaveRoom => "leave_room",
            Self::Ping => "ping",
        }
    }
}

/// A missing or `null` payload means "all defaults".
fn payload_as<T: DeserializeOwned + Default>(
    payload: serde_json::Value,
) -> Result<T, ProtocolError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload).map_err(ProtocolError::Decode)
}

// ---------------------------------------------------------------------------
// ServerEvent: server → client
// ---------------------------------------------------------------------------

/// What a participant learns about their new partner.
///
/// Each side of a match receives its own descriptor: the same session id,
/// but the *other* member's alias, language and region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFound {
    pub session_id: SessionId,
    pub partner_alias: String,
    /// The partner's native language, i.e. the one being practised.
    pub partner_language: String,
    pub partner_region: String,
    pub shared_interests: Vec<String>,
    /// `true` for the side whose join completed the match.
    pub initiator: bool,
}

/// A relayed chat line, as delivered to the partner and echoed to the
/// sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDelivery {
    /// The sender's display alias.
    pub from: String,
    /// The sender's text after sanitizing.
    pub text: String,
    /// The text in `target_language`, or the original when translation
    /// was unavailable.
    pub translated_text: String,
    pub target_language: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Every event the server may push.
///
/// `#[serde(tag = "type", content = "payload")]` produces the same
/// `{type, payload}` frame clients send. Unit variants carry no payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once, right after authentication.
    Connected {
        identity_id: IdentityId,
        alias: String,
        online: usize,
    },

    /// The join was accepted and no partner was available yet.
    QueueJoined { position: usize },
    QueueLeft,
    AlreadyQueued,
    AlreadyInSession,
    /// The participant waited longer than the queue timeout.
    QueueTimeout,

    MatchFound(MatchFound),

    /// A chat line from the partner.
    ChatMessage(ChatDelivery),
    /// Confirmation that the sender's own line was relayed.
    ChatSent(ChatDelivery),

    PartnerTyping,
    PartnerStopTyping,

    LanguagesUpdated {
        native_language: String,
        target_language: String,
    },
    InterestsUpdated { interests: Vec<String> },

    ReportSubmitted { report_id: ReportId },
    UserBlocked,

    /// The partner left, blocked, or disconnected. The session is gone.
    PartnerLeft,
    /// The session outlived its time-to-live and was closed.
    SessionExpired,

    Pong { online: usize, queued: usize },

    /// `code` follows HTTP conventions (401 unauthorized, etc.).
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonCodec;

    fn decode(json: &str) -> Result<Option<ClientEvent>, ProtocolError> {
        ClientEvent::decode(&JsonCodec, json.as_bytes())
    }

    // =======================================================================
    // Inbound decoding
    // =======================================================================

    #[test]
    fn test_decode_event_without_payload() {
        let event = decode(r#"{"type":"leave_queue"}"#).unwrap();
        assert_eq!(event, Some(ClientEvent::LeaveQueue));
    }

    #[test]
    fn test_decode_join_queue_without_payload_uses_defaults() {
        let event = decode(r#"{"type":"join_queue"}"#).unwrap();
        assert_eq!(event, Some(ClientEvent::JoinQueue(JoinQueue::default())));
    }

    #[test]
    fn test_decode_join_queue_with_profile_overrides() {
        let event = decode(
            r#"{"type":"join_queue","payload":{"nativeLanguage":"es",
                "target_language":"en","interests":["music","hiking"]}}"#,
        )
        .unwrap();

        let Some(ClientEvent::JoinQueue(join)) = event else {
            panic!("expected JoinQueue, got {event:?}");
        };
        assert_eq!(join.native_language.as_deref(), Some("es"));
        assert_eq!(join.target_language.as_deref(), Some("en"));
        assert_eq!(
            join.interests,
            Some(vec!["music".to_string(), "hiking".to_string()])
        );
        assert_eq!(join.region, None);
    }

    #[test]
    fn test_decode_chat_message_accepts_message_alias() {
        let event =
            decode(r#"{"type":"chat_message","payload":{"message":"hola"}}"#)
                .unwrap();
        assert_eq!(
            event,
            Some(ClientEvent::ChatMessage(ChatText { text: "hola".into() }))
        );
    }

    #[test]
    fn test_decode_report_user_payload() {
        let event = decode(
            r#"{"type":"report_user","payload":{"reason":"spam","details":"links"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(ClientEvent::ReportUser(ReportUser {
                reason: "spam".into(),
                details: "links".into(),
            }))
        );
    }

    #[test]
    fn test_decode_unknown_type_is_none() {
        let event = decode(r#"{"type":"dance","payload":{"style":"salsa"}}"#);
        assert!(matches!(event, Ok(None)));
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_missing_type_returns_error() {
        let result = decode(r#"{"payload":{}}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_known_type_with_wrong_payload_shape_returns_error() {
        let result =
            decode(r#"{"type":"update_interests","payload":{"interests":7}}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_client_event_kind_matches_wire_tag() {
        let event = decode(r#"{"type":"stop_typing"}"#).unwrap().unwrap();
        assert_eq!(event.kind(), "stop_typing");
    }

    // =======================================================================
    // Outbound shape
    // =======================================================================

    #[test]
    fn test_unit_server_event_has_no_payload() {
        let json = serde_json::to_value(ServerEvent::PartnerLeft).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "partner_left" }));
    }

    #[test]
    fn test_queue_joined_json_format() {
        let json =
            serde_json::to_value(ServerEvent::QueueJoined { position: 3 })
                .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "queue_joined", "payload": { "position": 3 } })
        );
    }

    #[test]
    fn test_match_found_json_format() {
        let event = ServerEvent::MatchFound(MatchFound {
            session_id: SessionId(5),
            partner_alias: "QuietOtter12".into(),
            partner_language: "en".into(),
            partner_region: "US".into(),
            shared_interests: vec!["music".into()],
            initiator: true,
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "match_found");
        assert_eq!(json["payload"]["session_id"], 5);
        assert_eq!(json["payload"]["partner_alias"], "QuietOtter12");
        assert_eq!(json["payload"]["shared_interests"][0], "music");
        assert_eq!(json["payload"]["initiator"], true);
    }

    #[test]
    fn test_chat_message_json_format() {
        let event = ServerEvent::ChatMessage(ChatDelivery {
            from: "BoldFox1".into(),
            text: "hola".into(),
            translated_text: "hello".into(),
            target_language: "en".into(),
            timestamp: 1_700_000_000_000,
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "chat_message");
        assert_eq!(json["payload"]["text"], "hola");
        assert_eq!(json["payload"]["translated_text"], "hello");
    }

    #[test]
    fn test_error_json_format() {
        let event = ServerEvent::Error {
            code: 401,
            message: "invalid_token".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "error",
                "payload": { "code": 401, "message": "invalid_token" }
            })
        );
    }

    #[test]
    fn test_server_event_decodes_back_for_clients() {
        let bytes = JsonCodec
            .encode(&ServerEvent::Pong { online: 4, queued: 1 })
            .unwrap();
        let decoded: ServerEvent = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, ServerEvent::Pong { online: 4, queued: 1 });
    }
}
