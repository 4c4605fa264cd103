use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    server::AppState,
    transport::{
        middleware::{add_response_headers, check_auth},
        routes::{events, sessions, stats},
        websocket_server,
    },
};

const API_V1: &str = "/v1";

pub fn router(state: Arc<AppState>) -> Router {
    let v1_routes = Router::new()
        .route("/events", post(events::post_event))
        .route("/sessions", get(sessions::get_sessions))
        .route(
            "/sessions/{channel_id}",
            get(sessions::get_session).delete(sessions::stop_session),
        )
        .route("/stats", get(stats::get_stats))
        .route("/websocket", get(websocket_server::events_handler))
        .route("/voice/{channel_id}", get(websocket_server::voice_handler));

    Router::new()
        .nest(API_V1, v1_routes)
        .route("/version", get(stats::get_version))
        .layer(middleware::from_fn_with_state(state.clone(), check_auth))
        .layer(middleware::from_fn(add_response_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::{testing::*, *};

    #[tokio::test]
    async fn test_missing_password_is_unauthorized() {
        let app = router(state());
        let response = app
            .oneshot(Request::get("/v1/sessions").body(Body::empty()).expect("request"))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = router(state());
        let response = app
            .oneshot(
                Request::get("/version")
                    .header("authorization", "guess")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_version_header() {
        let app = router(state());
        let response = app
            .oneshot(
                Request::get("/version")
                    .header("authorization", PASSWORD)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("project-em-api-version").map(|v| v.as_bytes()),
            Some(&b"1"[..])
        );
    }
}
