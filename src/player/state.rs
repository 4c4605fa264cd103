use serde::Serialize;
use uuid::Uuid;

use crate::common::types::{ChannelId, GuildId, UserId, now_ms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
        })
    }
}

/// One queued item. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackRequest {
    pub id: Uuid,
    pub locator: String,
    pub requester: UserId,
    pub requester_name: String,
    /// Text channel that replies about this request go to.
    pub text_channel: ChannelId,
    /// Unix milliseconds; orders requests within a queue.
    pub enqueued_at: u64,
}

impl PlaybackRequest {
    pub fn new(
        locator: impl Into<String>,
        requester: UserId,
        requester_name: impl Into<String>,
        text_channel: ChannelId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator: locator.into(),
            requester,
            requester_name: requester_name.into(),
            text_channel,
            enqueued_at: now_ms(),
        }
    }
}

/// Read-only view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub state: PlaybackState,
    pub current: Option<PlaybackRequest>,
    /// Playback position of `current` in milliseconds.
    pub position: u64,
    pub pending: Vec<PlaybackRequest>,
    pub created_at: u64,
}
