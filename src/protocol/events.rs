use serde::Serialize;

use crate::{
    command::Reply,
    common::{
        Severity,
        types::{ChannelId, GuildId},
    },
    media::MediaInfo,
    monitoring::Stats,
    player::PlaybackRequest,
};

/// Messages pushed to websocket subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum OutgoingMessage {
    /// A reply to a command, to be posted in `channelId`.
    Reply {
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
        #[serde(flatten)]
        reply: Reply,
    },
    #[serde(rename = "event")]
    Event {
        #[serde(flatten)]
        event: PlayerEvent,
    },
    /// Operational message for the developer log channel.
    Devlog {
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
        content: String,
    },
    /// Periodic heartbeat sent to each websocket subscriber.
    Stats(Stats),
}

/// Events emitted by a session's player.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    #[serde(rename = "TrackStartEvent")]
    TrackStart {
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
        #[serde(rename = "guildId")]
        guild_id: Option<GuildId>,
        track: PlaybackRequest,
        info: MediaInfo,
    },

    #[serde(rename = "TrackEndEvent")]
    TrackEnd {
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
        #[serde(rename = "guildId")]
        guild_id: Option<GuildId>,
        track: PlaybackRequest,
        reason: TrackEndReason,
    },

    #[serde(rename = "TrackExceptionEvent")]
    TrackException {
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
        #[serde(rename = "guildId")]
        guild_id: Option<GuildId>,
        track: PlaybackRequest,
        exception: TrackException,
    },

    #[serde(rename = "QueueFinishedEvent")]
    QueueFinished {
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
        #[serde(rename = "guildId")]
        guild_id: Option<GuildId>,
    },
}

impl PlayerEvent {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::TrackStart { channel_id, .. }
            | Self::TrackEnd { channel_id, .. }
            | Self::TrackException { channel_id, .. }
            | Self::QueueFinished { channel_id, .. } => *channel_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    Finished,
    Skipped,
    Stopped,
    LoadFailed,
    /// Torn down because the sink went away.
    Cleanup,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackException {
    pub message: String,
    pub severity: Severity,
    pub cause: String,
}
