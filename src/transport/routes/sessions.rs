use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    common::{ApiError, types::ChannelId},
    player::SessionSnapshot,
    server::AppState,
};

fn parse_channel(raw: &str, path: String) -> Result<ChannelId, ApiError> {
    raw.parse::<ChannelId>()
        .map_err(|_| ApiError::bad_request(format!("`{raw}` is not a channel id"), path))
}

/// GET /v1/sessions
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSnapshot>> {
    Json(state.registry.snapshots())
}

/// GET /v1/sessions/{channel_id}
pub async fn get_session(
    Path(channel_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let path = format!("/v1/sessions/{channel_id}");
    let channel = match parse_channel(&channel_id, path.clone()) {
        Ok(channel) => channel,
        Err(e) => return e.into_response(),
    };

    match state.registry.get(channel) {
        Some(session) => Json(session.snapshot()).into_response(),
        None => ApiError::not_found("Session not found", path).into_response(),
    }
}

/// DELETE /v1/sessions/{channel_id}
///
/// Stops playback and clears the queue; the session is destroyed once its
/// driver exits.
pub async fn stop_session(
    Path(channel_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let path = format!("/v1/sessions/{channel_id}");
    let channel = match parse_channel(&channel_id, path.clone()) {
        Ok(channel) => channel,
        Err(e) => return e.into_response(),
    };

    match state.registry.get(channel) {
        Some(session) => {
            let cleared = session.stop();
            tracing::info!("Session {} stopped over REST, {} cleared", channel, cleared);
            StatusCode::NO_CONTENT.into_response()
        }
        None => ApiError::not_found("Session not found", path).into_response(),
    }
}
