use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{command::InboundEvent, server::AppState};

/// POST /v1/events
///
/// Returns the reply for commands and `204 No Content` for anything the bot
/// ignores.
pub async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<InboundEvent>,
) -> Response {
    tracing::trace!("POST /v1/events from {}", event.caller.user_id);
    match state.bot.handle_event(&event).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::transport::{
        http_server::{
            router,
            testing::{PASSWORD, state},
        },
    };

    fn post(body: Value) -> Request<Body> {
        Request::post("/v1/events")
            .header("authorization", PASSWORD)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn message(content: &str) -> Value {
        json!({
            "type": "message",
            "content": content,
            "caller": { "userId": 111111111111111111u64, "name": "tester", "roles": [] },
            "guildId": 222222222222222222u64,
            "channelId": 333333333333333333u64,
            "voiceChannelId": 444444444444444444u64
        })
    }

    #[tokio::test]
    async fn test_command_returns_reply() {
        let state = state();
        let response = router(state.clone())
            .oneshot(post(message("!play https://a.example/song.mp3")))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let reply: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(reply["content"], "Starting **song.mp3**.");
        assert_eq!(state.registry.len(), 1);
        state.registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_plain_message_is_no_content() {
        let response = router(state())
            .oneshot(post(message("just chatting")))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_interaction_is_dispatched() {
        let body = json!({
            "type": "interaction",
            "name": "remove",
            "options": [{ "name": "position", "value": 1 }],
            "caller": { "userId": 111111111111111111u64, "name": "tester" },
            "channelId": 333333333333333333u64,
            "voiceChannelId": 444444444444444444u64
        });
        let response = router(state()).oneshot(post(body)).await.expect("infallible");
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let reply: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(reply["content"], "`remove` requires the DJ permission.");
        assert_eq!(reply["ephemeral"], true);
    }
}
