use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::{
    common::{ApiError, types::ChannelId},
    protocol::OutgoingMessage,
    server::AppState,
};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// GET /v1/websocket
///
/// Streams replies, player events and devlog messages to the chat gateway.
pub async fn events_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_events_socket(socket, state))
}

async fn handle_events_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.hub.subscribe();
    info!("Event subscriber connected ({} total)", state.hub.subscribers());
    state.bot.announce_ready();

    let mut stats_interval = tokio::time::interval(STATS_INTERVAL);
    stats_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        let outgoing = tokio::select! {
            _ = stats_interval.tick() => {
                OutgoingMessage::Stats(state.stats.collect(&state.registry))
            }
            message = rx.recv() => match message {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, {} messages skipped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(_))) => {
                        debug!("Ignoring text from event subscriber; use POST /v1/events");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Event socket error: {}", e);
                        break;
                    }
                }
                continue;
            }
        };

        let json = match serde_json::to_string(&outgoing) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize outgoing message: {}", e);
                continue;
            }
        };
        if let Err(e) = socket.send(Message::Text(json.into())).await {
            error!("Event socket send error: {}", e);
            break;
        }
    }

    info!("Event subscriber disconnected");
}

/// GET /v1/voice/{channel_id}
///
/// Attaches a voice bridge for the channel. Each binary message carries one
/// frame of interleaved s16le PCM.
pub async fn voice_handler(
    Path(channel_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let channel_id = match channel_id.parse::<ChannelId>() {
        Ok(id) => id,
        Err(_) => {
            return ApiError::bad_request(
                format!("`{channel_id}` is not a channel id"),
                format!("/v1/voice/{channel_id}"),
            )
            .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_voice_socket(socket, state, channel_id))
}

async fn handle_voice_socket(mut socket: WebSocket, state: Arc<AppState>, channel_id: ChannelId) {
    let (attachment, frames) = state.bridge.attach(channel_id);
    info!("Voice bridge attached for {}", channel_id);

    loop {
        tokio::select! {
            frame = frames.recv_async() => match frame {
                Ok(frame) => {
                    if let Err(e) = socket.send(Message::Binary(frame)).await {
                        warn!("Voice bridge send error for {}: {}", channel_id, e);
                        break;
                    }
                }
                Err(_) => {
                    // The session left the channel or a newer bridge replaced us.
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Voice bridge socket error for {}: {}", channel_id, e);
                    break;
                }
            },
        }
    }

    state.bridge.detach(channel_id, attachment);
    info!("Voice bridge for {} closed", channel_id);
}
