//! Command registration and dispatch.
//!
//! Commands are registered once at startup into a [`CommandRouter`]. Each
//! command declares a permission level and a parameter schema and points at a
//! [`CommandHandler`]; the router enforces both before the handler runs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod args;
pub mod builtin;
pub mod event;
pub mod reply;
pub mod router;

pub use args::{ArgValue, ArgumentError, Args, ParamKind, ParamSpec};
pub use event::{Caller, EventKind, InboundEvent, Invocation};
pub use reply::Reply;
pub use router::CommandRouter;

use crate::{
    common::types::{ChannelId, GuildId},
    configs::RolesConfig,
    player::QueueError,
};

/// Ordered permission levels. A caller may run commands at or below their level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionLevel {
    Everyone,
    Dj,
    Admin,
}

impl PermissionLevel {
    /// Resolves a caller's level from their role names.
    pub fn of(caller: &Caller, roles: &RolesConfig) -> Self {
        let has = |role: &str| caller.roles.iter().any(|r| r.eq_ignore_ascii_case(role));
        if has(&roles.admin) {
            Self::Admin
        } else if has(&roles.dj) {
            Self::Dj
        } else {
            Self::Everyone
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Everyone => "everyone",
            Self::Dj => "DJ",
            Self::Admin => "admin",
        })
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("a command named `{0}` is already registered")]
    Duplicate(String),

    #[error("unknown command `{0}`")]
    NotFound(String),

    #[error("`{command}` requires the {required} permission")]
    PermissionDenied {
        command: String,
        required: PermissionLevel,
    },

    #[error("{0}")]
    Argument(#[from] ArgumentError),

    #[error("you need to be in a voice channel")]
    NotInVoiceChannel,

    #[error("the link is not supported: {0}")]
    UnsupportedLocator(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl CommandError {
    /// The rejection shown to the invoking user.
    pub fn to_reply(&self) -> Reply {
        let message = match self {
            Self::Argument(err) => format!("Invalid arguments: {err}."),
            other => {
                let text = other.to_string();
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
                    None => text,
                }
            }
        };
        Reply::error(message).ephemeral()
    }
}

/// Everything a handler may know about the invocation besides its arguments.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub command: String,
    pub caller: Caller,
    pub level: PermissionLevel,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub voice_channel_id: Option<ChannelId>,
    pub timestamp: Option<u64>,
}

impl CommandContext {
    /// Voice channel of the caller, required by playback commands.
    pub fn voice_channel(&self) -> Result<ChannelId, CommandError> {
        self.voice_channel_id.ok_or(CommandError::NotInVoiceChannel)
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext, args: &Args) -> Result<Reply, CommandError>;
}

/// A registered command. Immutable once registered.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: &'static str,
    pub permission: PermissionLevel,
    pub params: Vec<ParamSpec>,
    pub handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new(name: &str, description: &'static str, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.to_lowercase(),
            description,
            permission: PermissionLevel::Everyone,
            params: Vec::new(),
            handler,
        }
    }

    pub fn permission(mut self, level: PermissionLevel) -> Self {
        self.permission = level;
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// One-line usage, e.g. `play <url>` or `remove [position]`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for p in &self.params {
            if p.required {
                usage.push_str(&format!(" <{}>", p.name));
            } else {
                usage.push_str(&format!(" [{}]", p.name));
            }
        }
        usage
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("permission", &self.permission)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
