//! HTTP side of the demo: credential issuance, quick match and health.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tandem::prelude::*;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<AnonymousIssuer>,
    pub relay: Arc<Relay<WebSocketConnection, Passthrough>>,
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/auth/anonymous", post(issue_handler))
        .route("/v1/match/join", post(join_handler))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub online: usize,
    pub queued: usize,
    pub sessions: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IssueBody {
    pub anonymous_id: Option<String>,
    pub alias: Option<String>,
    pub native_language: Option<String>,
    pub target_language: Option<String>,
    pub interests: Option<Vec<String>>,
    pub region: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueResponse {
    pub token: String,
    pub identity_id: IdentityId,
    pub alias: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JoinResponse {
    Matched {
        #[serde(rename = "match")]
        found: MatchFound,
    },
    Queued {
        position: usize,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, code: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: code.to_string(),
        }),
    )
        .into_response()
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.relay.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        online: stats.online,
        queued: stats.queued,
        sessions: stats.sessions,
    })
}

/// POST /v1/auth/anonymous
///
/// The returned token is hex, so it can go straight into `?token=`.
async fn issue_handler(
    State(state): State<AppState>,
    Json(body): Json<IssueBody>,
) -> (StatusCode, Json<IssueResponse>) {
    let issued = state.issuer.issue(IssueRequest {
        anonymous_id: body.anonymous_id.filter(|id| !id.is_empty()),
        alias: body.alias,
        profile: ProfileUpdate {
            native_language: body.native_language,
            target_language: body.target_language,
            interests: body.interests,
            region: body.region,
        },
    });
    (
        StatusCode::CREATED,
        Json(IssueResponse {
            token: issued.credential,
            identity_id: issued.identity.id,
            alias: issued.identity.alias,
        }),
    )
}

/// POST /v1/match/join
async fn join_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or("");

    let identity = match state.issuer.authenticate(credential).await {
        Ok(identity) => identity,
        Err(e) => return error_response(StatusCode::UNAUTHORIZED, e.code()),
    };

    match state.relay.quick_match(identity).await {
        Ok(QuickMatch::Matched(found)) => {
            (StatusCode::OK, Json(JoinResponse::Matched { found })).into_response()
        }
        Ok(QuickMatch::Queued { position }) => {
            (StatusCode::ACCEPTED, Json(JoinResponse::Queued { position })).into_response()
        }
        Err(MatchError::AlreadyQueued(_)) => {
            error_response(StatusCode::CONFLICT, "already_queued")
        }
        Err(MatchError::AlreadyInSession(_)) => {
            error_response(StatusCode::CONFLICT, "already_in_session")
        }
        Err(e @ MatchError::SameIdentity(_)) => {
            tracing::warn!(error = %e, "quick match refused");
            error_response(StatusCode::CONFLICT, "same_identity")
        }
    }
}
