use std::sync::Arc;

use async_trait::async_trait;

use super::{dj, session_of};
use crate::{
    command::{
        Args, Command, CommandContext, CommandError, CommandHandler, ParamKind, ParamSpec, Reply,
    },
    media::{MediaFetchError, locator},
    player::{EnqueueOutcome, PlaybackRequest},
    server::SessionRegistry,
};

pub fn play(registry: Arc<SessionRegistry>) -> Command {
    Command::new("play", "Plays an audio file from a link", Arc::new(Play { registry }))
        .param(ParamSpec::required("url", ParamKind::Url))
}

pub fn skip(registry: Arc<SessionRegistry>) -> Command {
    Command::new("skip", "Skips the current track", Arc::new(Skip { registry }))
}

pub fn pause(registry: Arc<SessionRegistry>) -> Command {
    Command::new("pause", "Pauses playback", Arc::new(Pause { registry }))
}

pub fn resume(registry: Arc<SessionRegistry>) -> Command {
    Command::new("resume", "Resumes paused playback", Arc::new(Resume { registry }))
}

pub fn stop(registry: Arc<SessionRegistry>) -> Command {
    dj(Command::new(
        "stop",
        "Stops playback and clears the queue",
        Arc::new(Stop { registry }),
    ))
}

struct Play {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Play {
    async fn handle(&self, ctx: &CommandContext, args: &Args) -> Result<Reply, CommandError> {
        let voice_channel = ctx.voice_channel()?;
        let url = args.text("url").unwrap_or_default().trim();

        locator::check(url).map_err(|e| match e {
            MediaFetchError::Unsupported(reason) => CommandError::UnsupportedLocator(reason),
            other => CommandError::UnsupportedLocator(other.to_string()),
        })?;

        let request = PlaybackRequest::new(url, ctx.caller.user_id, &ctx.caller.name, ctx.channel_id);
        let name = locator::display_name(url);
        let (_, outcome) = self.registry.enqueue(voice_channel, ctx.guild_id, request)?;

        Ok(match outcome {
            EnqueueOutcome::Started => Reply::success(format!("Starting **{name}**.")),
            EnqueueOutcome::Queued { position } => {
                Reply::info(format!("Queued **{name}** at position {position}."))
            }
        })
    }
}

struct Skip {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Skip {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let skipped = session_of(&self.registry, ctx)?.skip()?;
        Ok(Reply::success(format!(
            "Skipped **{}**.",
            locator::display_name(&skipped.locator)
        )))
    }
}

struct Pause {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Pause {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        session_of(&self.registry, ctx)?.pause()?;
        Ok(Reply::success("Paused."))
    }
}

struct Resume {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Resume {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        session_of(&self.registry, ctx)?.resume()?;
        Ok(Reply::success("Resumed."))
    }
}

struct Stop {
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl CommandHandler for Stop {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let cleared = session_of(&self.registry, ctx)?.stop();
        Ok(Reply::success(format!(
            "Stopped playback, {cleared} track{} cleared.",
            if cleared == 1 { "" } else { "s" }
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::super::harness::{VOICE, bench};
    use crate::{
        command::{CommandError, event::fixtures::message},
        common::types::ChannelId,
        player::{PlaybackState, QueueError},
    };

    #[tokio::test]
    async fn test_play_needs_voice_channel() {
        let bench = bench();
        let err = bench
            .run_event(message("!play https://a.example/x.mp3", &[], None))
            .await
            .expect_err("not in voice");
        assert!(matches!(err, CommandError::NotInVoiceChannel));
        assert!(bench.registry.is_empty());
    }

    #[tokio::test]
    async fn test_play_rejects_unsupported_extension() {
        let bench = bench();
        let err = bench
            .run("!play https://a.example/page.html", &[])
            .await
            .expect_err("html is not audio");
        assert!(matches!(err, CommandError::UnsupportedLocator(_)));
        assert!(bench.registry.is_empty());
    }

    #[tokio::test]
    async fn test_play_starts_then_queues() {
        let bench = bench();
        let first = bench
            .run("!play https://a.example/first%20song.mp3", &[])
            .await
            .expect("starts");
        assert_eq!(first.content, "Starting **first song.mp3**.");

        let second = bench
            .run("!play https://a.example/second.ogg", &[])
            .await
            .expect("queues");
        assert_eq!(second.content, "Queued **second.ogg** at position 1.");

        let session = bench.registry.get(ChannelId(VOICE)).expect("session exists");
        assert_eq!(session.snapshot().pending.len(), 1);
        bench.registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_pause_resume_and_skip() {
        let bench = bench();
        bench.run("!play https://a.example/a.mp3", &[]).await.expect("starts");
        bench.run("!play https://a.example/b.mp3", &[]).await.expect("queues");

        bench.run("!pause", &[]).await.expect("pauses");
        let session = bench.registry.get(ChannelId(VOICE)).expect("session exists");
        assert_eq!(session.state(), PlaybackState::Paused);

        let err = bench.run("!pause", &[]).await.expect_err("already paused");
        assert!(matches!(err, CommandError::Queue(QueueError::AlreadyPaused)));

        bench.run("!resume", &[]).await.expect("resumes");
        let reply = bench.run("!skip", &[]).await.expect("skips");
        assert_eq!(reply.content, "Skipped **a.mp3**.");
        assert_eq!(session.current().map(|r| r.locator), Some("https://a.example/b.mp3".into()));
        bench.registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_skip_without_session() {
        let bench = bench();
        let err = bench.run("!skip", &[]).await.expect_err("nothing to skip");
        assert!(matches!(err, CommandError::Queue(QueueError::NothingPlaying)));
    }

    #[tokio::test]
    async fn test_stop_requires_dj() {
        let bench = bench();
        bench.run("!play https://a.example/a.mp3", &[]).await.expect("starts");

        let err = bench.run("!stop", &[]).await.expect_err("not a DJ");
        assert!(matches!(err, CommandError::PermissionDenied { .. }));

        let reply = bench.run("!stop", &["DJ"]).await.expect("DJ may stop");
        assert_eq!(reply.content, "Stopped playback, 1 track cleared.");
        bench.registry.shutdown().await;
    }
}
