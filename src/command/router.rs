use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::{
    Command, CommandContext, CommandError, Invocation, PermissionLevel, Reply,
    args::{Args, parse_options, parse_text},
    event::InboundEvent,
};
use crate::configs::RolesConfig;

/// Name-keyed command table.
///
/// Registration happens before the router is shared; lookups afterwards are
/// read-only, so no locking is needed.
pub struct CommandRouter {
    commands: HashMap<String, Command>,
    roles: RolesConfig,
}

impl CommandRouter {
    pub fn new(roles: RolesConfig) -> Self {
        Self {
            commands: HashMap::new(),
            roles,
        }
    }

    /// Adds a command. Names are matched case-insensitively and must be unique.
    pub fn register(&mut self, command: Command) -> Result<(), CommandError> {
        let key = command.name.to_lowercase();
        if self.commands.contains_key(&key) {
            return Err(CommandError::Duplicate(key));
        }
        debug!("Registered command /{} ({})", key, command.permission);
        self.commands.insert(key, command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.to_lowercase())
    }

    /// All commands sorted by name.
    pub fn commands(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.values().collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the handler context for `event`.
    pub fn context(&self, event: &InboundEvent, command: &str) -> CommandContext {
        CommandContext {
            command: command.to_string(),
            caller: event.caller.clone(),
            level: PermissionLevel::of(&event.caller, &self.roles),
            guild_id: event.guild_id,
            channel_id: event.channel_id,
            voice_channel_id: event.voice_channel_id,
            timestamp: event.timestamp,
        }
    }

    /// Resolves, authorises, parses and runs a single invocation.
    ///
    /// Every failure leaves player state untouched; the handler is only called
    /// once all checks pass.
    pub async fn dispatch(
        &self,
        invocation: &Invocation,
        ctx: &CommandContext,
    ) -> Result<Reply, CommandError> {
        let name = invocation.name();
        let Some(command) = self.get(name) else {
            return Err(CommandError::NotFound(name.to_string()));
        };

        if ctx.level < command.permission {
            warn!(
                "{} ({}) tried /{} without the {} permission",
                ctx.caller.name, ctx.caller.user_id, command.name, command.permission
            );
            return Err(CommandError::PermissionDenied {
                command: command.name.clone(),
                required: command.permission,
            });
        }

        let args: Args = match invocation {
            Invocation::Text { rest, .. } => parse_text(&command.params, rest)?,
            Invocation::Options { options, .. } => parse_options(&command.params, options)?,
        };

        info!(
            "{} used /{} {} (ID: {})",
            ctx.caller.name,
            command.name,
            args.rendered().join(" "),
            ctx.caller.user_id
        );

        let result = command.handler.handle(ctx, &args).await;

        match &result {
            Ok(_) => debug!("/{} by {} ended", command.name, ctx.caller.name),
            Err(e) => debug!("/{} by {} ended with: {}", command.name, ctx.caller.name, e),
        }
        result
    }
}
