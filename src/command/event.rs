use serde::{Deserialize, Serialize};

use crate::common::types::{ChannelId, GuildId, UserId};

/// Who triggered an event, as seen by the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub user_id: UserId,
    pub name: String,
    /// Role names the member holds in the guild.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    /// Plain chat message. Only messages starting with the prefix are commands.
    Message { content: String },
    /// Slash-command interaction with named options.
    Interaction {
        name: String,
        #[serde(default)]
        options: Vec<InteractionOption>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    pub value: serde_json::Value,
}

/// An inbound chat-platform event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub caller: Caller,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Text channel the event was posted in; replies go here.
    pub channel_id: ChannelId,
    /// Voice channel the caller is connected to, if any.
    #[serde(default)]
    pub voice_channel_id: Option<ChannelId>,
    /// Platform timestamp of the event in unix milliseconds.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// A resolved command invocation: the name plus its unparsed input.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Text { name: String, rest: String },
    Options {
        name: String,
        options: Vec<(String, serde_json::Value)>,
    },
}

impl Invocation {
    /// Extracts the invocation from an event.
    ///
    /// Returns `None` for messages that do not start with `prefix`.
    pub fn from_event(event: &InboundEvent, prefix: &str) -> Option<Self> {
        match &event.kind {
            EventKind::Message { content } => {
                let body = content.trim_start().strip_prefix(prefix)?;
                let body = body.trim_start();
                let (name, rest) = match body.find(char::is_whitespace) {
                    Some(i) => (&body[..i], body[i..].trim_start()),
                    None => (body, ""),
                };
                if name.is_empty() {
                    return None;
                }
                Some(Self::Text {
                    name: name.to_lowercase(),
                    rest: rest.to_string(),
                })
            }
            EventKind::Interaction { name, options } => Some(Self::Options {
                name: name.trim().to_lowercase(),
                options: options
                    .iter()
                    .map(|o| (o.name.clone(), o.value.clone()))
                    .collect(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::Options { name, .. } => name,
        }
    }
}
