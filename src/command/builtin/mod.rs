//! The bot's command set.

use std::sync::{Arc, OnceLock};

use super::{Command, CommandContext, CommandError, CommandRouter, PermissionLevel};
use crate::{monitoring::StatsCollector, player::Session, server::SessionRegistry};

mod info;
mod playback;
mod queue;

pub use info::HelpEntry;

/// Registers every built-in command on `router`.
pub fn register_all(
    router: &mut CommandRouter,
    registry: Arc<SessionRegistry>,
    stats: Arc<StatsCollector>,
) -> Result<(), CommandError> {
    let catalogue = Arc::new(OnceLock::new());

    let commands = [
        playback::play(registry.clone()),
        playback::skip(registry.clone()),
        playback::pause(registry.clone()),
        playback::resume(registry.clone()),
        playback::stop(registry.clone()),
        queue::queue(registry.clone()),
        queue::nowplaying(registry.clone()),
        queue::remove(registry.clone()),
        queue::shuffle(registry.clone()),
        info::ping(),
        info::stats(registry, stats),
        info::help(catalogue.clone()),
    ];
    for command in commands {
        router.register(command)?;
    }

    let entries = router.commands().into_iter().map(HelpEntry::from).collect();
    let _ = catalogue.set(entries);
    Ok(())
}

/// The caller's voice channel session, which every control command acts on.
fn session_of(registry: &SessionRegistry, ctx: &CommandContext) -> Result<Arc<Session>, CommandError> {
    let channel_id = ctx.voice_channel()?;
    registry
        .get(channel_id)
        .ok_or(CommandError::Queue(crate::player::QueueError::NothingPlaying))
}

fn dj(command: Command) -> Command {
    command.permission(PermissionLevel::Dj)
}
