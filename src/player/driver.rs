use std::sync::Arc;

use tracing::{debug, warn};

use super::{session::Session, state::PlaybackRequest};
use crate::{
    common::Severity,
    media::{MediaFetcher, fetch_with_retry},
    protocol::TrackEndReason,
    sink::{AudioSink, SinkError, TrackControl},
};

pub struct DriverCtx {
    pub session: Arc<Session>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub sink: Arc<dyn AudioSink>,
    pub fetch_retries: u32,
}

/// Plays a session's queue until it drains, then returns.
///
/// One driver runs per session. The session closes itself when the driver
/// finds nothing left to play.
pub async fn run_driver(ctx: DriverCtx) {
    let channel_id = ctx.session.channel_id;
    debug!("[{}] driver started ({})", channel_id, ctx.sink.name());

    while let Some((track, control)) = ctx.session.next_track() {
        play_track(&ctx, track, control).await;
    }

    debug!("[{}] driver finished", channel_id);
}

async fn play_track(ctx: &DriverCtx, track: PlaybackRequest, control: TrackControl) {
    let DriverCtx {
        session,
        fetcher,
        sink,
        fetch_retries,
    } = ctx;
    let cancel = control.cancel.clone();

    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => return shutdown_if_needed(session),
        fetched = fetch_with_retry(&**fetcher, &track.locator, *fetch_retries) => fetched,
    };

    let media = match fetched {
        Ok(media) => media,
        Err(e) => {
            let severity = if e.is_retryable() {
                Severity::Suspicious
            } else {
                Severity::Common
            };
            session.track_exception(&track, &e.to_string(), severity);
            session.finish(track.id, TrackEndReason::LoadFailed);
            return;
        }
    };

    session.track_started(&track, media.info.clone());
    let result = sink.play(session.channel_id, media, control.clone()).await;

    if cancel.is_cancelled() {
        // Skip and stop already moved the queue on.
        return shutdown_if_needed(session);
    }

    match result {
        Ok(()) => {
            session.finish(track.id, TrackEndReason::Finished);
        }
        Err(SinkError::Decode(e)) => {
            session.track_exception(&track, &e, Severity::Fault);
            session.finish(track.id, TrackEndReason::LoadFailed);
        }
        Err(SinkError::Disconnected) => session.sink_disconnected(),
    }
}

/// A cancel that came from process shutdown rather than skip/stop leaves the
/// queue untouched, so clear it here to let the driver exit.
fn shutdown_if_needed(session: &Session) {
    if session.is_shutting_down() {
        warn!("[{}] shutting down, clearing queue", session.channel_id);
        session.stop();
    }
}
