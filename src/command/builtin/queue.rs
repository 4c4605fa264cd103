use std::{fmt::Write, sync::Arc};

use async_trait::async_trait;

use super::{dj, session_of};
use crate::{
    command::{
        Args, Command, CommandContext, CommandError, CommandHandler, ParamKind, ParamSpec, Reply,
    },
    common::format::format_duration,
    media::locator::display_name,
    player::{PlaybackRequest, PlaybackState, QueueError},
    server::SessionRegistry,
};

/// Pending entries listed by `queue` before the rest is summarised.
const QUEUE_PAGE: usize = 10;

pub fn queue(registry: Arc<SessionRegistry>) -> Command {
    Command::new("queue", "Shows the queue", Arc::new(Queue { registry }))
}

pub fn nowplaying(registry: Arc<SessionRegistry>) -> Command {
    Command::new(
        "nowplaying",
        "Shows the current track",
        Arc::new(NowPlaying { registry }),
    )
}

pub fn remove(registry: Arc<SessionRegistry>) -> Command {
    dj(Command::new(
        "remove",
        "Removes a track from the queue",
        Arc::new(Remove { registry }),
    ))
    .param(ParamSpec::required(
        "position",
        ParamKind::Integer {
            min: Some(1),
            max: None,
        },
    ))
}

pub fn shuffle(registry: Arc<SessionRegistry>) -> Command {
    dj(Command::new(
        "shuffle",
        "Shuffles the queue",
        Arc::new(Shuffle { registry }),
    ))
}

fn entry(request: &PlaybackRequest) -> String {
    format!(
        "**{}** (requested by {})",
        display_name(&request.locator),
        request.requester_name
    )
}

struct Queue {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Queue {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let snapshot = session_of(&self.registry, ctx)?.snapshot();
        let current = snapshot.current.as_ref().ok_or(QueueError::NothingPlaying)?;

        let mut out = format!("Now playing: {}", entry(current));
        if snapshot.state == PlaybackState::Paused {
            out.push_str(" (paused)");
        }

        if snapshot.pending.is_empty() {
            out.push_str("\nThe queue is empty.");
        }
        for (i, request) in snapshot.pending.iter().take(QUEUE_PAGE).enumerate() {
            let _ = write!(out, "\n{}. {}", i + 1, entry(request));
        }
        if snapshot.pending.len() > QUEUE_PAGE {
            let _ = write!(out, "\n...and {} more", snapshot.pending.len() - QUEUE_PAGE);
        }

        Ok(Reply::info(out))
    }
}

struct NowPlaying {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for NowPlaying {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let snapshot = session_of(&self.registry, ctx)?.snapshot();
        let current = snapshot.current.as_ref().ok_or(QueueError::NothingPlaying)?;

        Ok(Reply::info(format!(
            "{} {} at {}",
            if snapshot.state == PlaybackState::Paused {
                "Paused:"
            } else {
                "Playing:"
            },
            entry(current),
            format_duration(snapshot.position)
        )))
    }
}

struct Remove {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Remove {
    async fn handle(&self, ctx: &CommandContext, args: &Args) -> Result<Reply, CommandError> {
        let position = args.integer("position").unwrap_or(1).max(1) as usize;
        let removed = session_of(&self.registry, ctx)?.remove(position)?;
        Ok(Reply::success(format!(
            "Removed **{}** from the queue.",
            display_name(&removed.locator)
        )))
    }
}

struct Shuffle {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Shuffle {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let shuffled = session_of(&self.registry, ctx)?.shuffle();
        Ok(Reply::success(format!("Shuffled {shuffled} tracks.")))
    }
}
