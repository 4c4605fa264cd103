use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    queue::{EnqueueOutcome, PlaybackQueue, QueueError},
    state::{PlaybackRequest, PlaybackState, SessionSnapshot},
};
use crate::{
    common::{
        Severity,
        types::{ChannelId, GuildId, now_ms},
    },
    media::MediaInfo,
    protocol::{EventHub, PlayerEvent, TrackEndReason, TrackException},
    sink::TrackControl,
};

struct ActiveTrack {
    id: Uuid,
    cancel: CancellationToken,
}

struct SessionInner {
    queue: PlaybackQueue,
    active: Option<ActiveTrack>,
    /// Set once the queue drained and the driver is leaving. Terminal.
    closed: bool,
}

/// One channel's player: its queue, playback state and position.
///
/// Every transition takes the inner lock, so skip, stop and a natural track
/// end are serialised. Events for a transition are published while the lock
/// is held, which keeps them in transition order.
pub struct Session {
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub created_at: u64,
    inner: Mutex<SessionInner>,
    paused: watch::Sender<bool>,
    position: Arc<AtomicU64>,
    driver_started: AtomicBool,
    hub: EventHub,
    shutdown: CancellationToken,
}

impl Session {
    pub fn new(
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
        max_queue_length: usize,
        hub: EventHub,
        shutdown: CancellationToken,
    ) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            channel_id,
            guild_id,
            created_at: now_ms(),
            inner: Mutex::new(SessionInner {
                queue: PlaybackQueue::new(max_queue_length),
                active: None,
                closed: false,
            }),
            paused,
            position: Arc::new(AtomicU64::new(0)),
            driver_started: AtomicBool::new(false),
            hub,
            shutdown,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().queue.state()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    pub fn current(&self) -> Option<PlaybackRequest> {
        self.inner.lock().queue.current().cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            state: inner.queue.state(),
            current: inner.queue.current().cloned(),
            position: self.position(),
            pending: inner.queue.pending().cloned().collect(),
            created_at: self.created_at,
        }
    }

    /// Returns true exactly once, for whoever should spawn the driver.
    pub(crate) fn claim_driver(&self) -> bool {
        !self.driver_started.swap(true, Ordering::AcqRel)
    }

    pub fn enqueue(&self, request: PlaybackRequest) -> Result<EnqueueOutcome, QueueError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }
        let locator = request.locator.clone();
        let outcome = inner.queue.enqueue(request)?;
        debug!("[{}] enqueued {} ({:?})", self.channel_id, locator, outcome);
        Ok(outcome)
    }

    pub fn skip(&self) -> Result<PlaybackRequest, QueueError> {
        let mut inner = self.inner.lock();
        let skipped = inner.queue.skip()?;
        Self::cancel_active(&mut inner, skipped.id);
        self.publish_end(&inner, skipped.clone(), TrackEndReason::Skipped);
        self.sync_paused(&inner);
        Ok(skipped)
    }

    pub fn pause(&self) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        inner.queue.pause()?;
        self.sync_paused(&inner);
        Ok(())
    }

    pub fn resume(&self) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        inner.queue.resume()?;
        self.sync_paused(&inner);
        Ok(())
    }

    /// Clears the queue and goes idle. Returns how many requests were dropped,
    /// counting the one that was playing.
    pub fn stop(&self) -> usize {
        let mut inner = self.inner.lock();
        let (current, discarded) = inner.queue.stop();
        if let Some(active) = inner.active.take() {
            active.cancel.cancel();
        }
        let count = discarded.len() + usize::from(current.is_some());
        if let Some(current) = current {
            self.publish_end(&inner, current, TrackEndReason::Stopped);
        }
        self.sync_paused(&inner);
        if count > 0 {
            info!("[{}] stopped, {} requests cleared", self.channel_id, count);
        }
        count
    }

    pub fn remove(&self, position: usize) -> Result<PlaybackRequest, QueueError> {
        self.inner.lock().queue.remove(position)
    }

    pub fn shuffle(&self) -> usize {
        self.inner.lock().queue.shuffle()
    }

    /// Hands the driver the current request and a fresh control for it.
    ///
    /// Returns `None` once there is nothing left to play, closing the session
    /// in the same step so no request can slip in afterwards.
    pub(crate) fn next_track(&self) -> Option<(PlaybackRequest, TrackControl)> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        let Some(request) = inner.queue.current().cloned() else {
            inner.closed = true;
            return None;
        };

        let cancel = self.shutdown.child_token();
        inner.active = Some(ActiveTrack {
            id: request.id,
            cancel: cancel.clone(),
        });
        self.position.store(0, Ordering::Release);

        Some((
            request,
            TrackControl {
                paused: self.paused.subscribe(),
                cancel,
                position: self.position.clone(),
            },
        ))
    }

    /// Completes `id` if it is still current. Stale completions are ignored.
    pub(crate) fn finish(&self, id: Uuid, reason: TrackEndReason) -> bool {
        let mut inner = self.inner.lock();
        let Some(finished) = inner.queue.finish(id) else {
            debug!("[{}] ignoring stale completion of {}", self.channel_id, id);
            return false;
        };
        if inner.active.as_ref().is_some_and(|a| a.id == id) {
            inner.active = None;
        }
        self.publish_end(&inner, finished, reason);
        self.sync_paused(&inner);
        true
    }

    /// The sink went away: drop everything and go idle.
    pub(crate) fn sink_disconnected(&self) {
        let mut inner = self.inner.lock();
        let (current, discarded) = inner.queue.stop();
        if let Some(active) = inner.active.take() {
            active.cancel.cancel();
        }
        warn!(
            "[{}] audio sink disconnected, discarding {} queued requests",
            self.channel_id,
            discarded.len()
        );
        if let Some(current) = current {
            self.publish_end(&inner, current, TrackEndReason::Cleanup);
        }
        self.sync_paused(&inner);
    }

    pub(crate) fn track_started(&self, track: &PlaybackRequest, info: MediaInfo) {
        info!("[{}] now playing {}", self.channel_id, info.title);
        self.hub.event(PlayerEvent::TrackStart {
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            track: track.clone(),
            info,
        });
    }

    pub(crate) fn track_exception(&self, track: &PlaybackRequest, message: &str, severity: Severity) {
        warn!("[{}] {} failed: {}", self.channel_id, track.locator, message);
        self.hub.event(PlayerEvent::TrackException {
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            track: track.clone(),
            exception: TrackException {
                message: format!("Could not play {}", track.locator),
                severity,
                cause: message.to_string(),
            },
        });
    }

    fn cancel_active(inner: &mut SessionInner, id: Uuid) {
        if inner.active.as_ref().is_some_and(|a| a.id == id) {
            if let Some(active) = inner.active.take() {
                active.cancel.cancel();
            }
        }
    }

    fn publish_end(&self, inner: &SessionInner, track: PlaybackRequest, reason: TrackEndReason) {
        self.hub.event(PlayerEvent::TrackEnd {
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            track,
            reason,
        });
        if inner.queue.is_idle() {
            self.hub.event(PlayerEvent::QueueFinished {
                channel_id: self.channel_id,
                guild_id: self.guild_id,
            });
        }
    }

    fn sync_paused(&self, inner: &SessionInner) {
        self.paused
            .send_replace(inner.queue.state() == PlaybackState::Paused);
    }
}
