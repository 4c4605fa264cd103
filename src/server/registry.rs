use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::info;

use crate::{
    common::types::{ChannelId, GuildId},
    configs::Config,
    media::MediaFetcher,
    player::{
        DriverCtx, EnqueueOutcome, PlaybackRequest, QueueError, Session, SessionSnapshot,
        run_driver,
    },
    protocol::EventHub,
    sink::AudioSink,
};

/// Live sessions, at most one per voice channel.
///
/// A session is created by the first enqueue into its channel and removed by
/// its own driver once its queue has drained.
pub struct SessionRegistry {
    sessions: DashMap<ChannelId, Arc<Session>>,
    fetcher: Arc<dyn MediaFetcher>,
    sink: Arc<dyn AudioSink>,
    hub: EventHub,
    max_queue_length: usize,
    fetch_retries: u32,
    shutdown: CancellationToken,
    drivers: TaskTracker,
}

impl SessionRegistry {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn MediaFetcher>,
        sink: Arc<dyn AudioSink>,
        hub: EventHub,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            fetcher,
            sink,
            hub,
            max_queue_length: config.player.max_queue_length,
            fetch_retries: config.audio.fetch_retries,
            shutdown: CancellationToken::new(),
            drivers: TaskTracker::new(),
        })
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    fn new_session(&self, channel_id: ChannelId, guild_id: Option<GuildId>) -> Arc<Session> {
        info!("Creating session for channel {}", channel_id);
        Arc::new(Session::new(
            channel_id,
            guild_id,
            self.max_queue_length,
            self.hub.clone(),
            self.shutdown.clone(),
        ))
    }

    /// Looks up or creates the session for `channel_id` and enqueues `request`.
    ///
    /// Both steps happen under the map entry lock. A session whose driver has
    /// already closed it is replaced rather than written to.
    pub fn enqueue(
        self: &Arc<Self>,
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
        request: PlaybackRequest,
    ) -> Result<(Arc<Session>, EnqueueOutcome), QueueError> {
        if self.shutdown.is_cancelled() {
            return Err(QueueError::Closed);
        }

        let mut entry = self
            .sessions
            .entry(channel_id)
            .or_insert_with(|| self.new_session(channel_id, guild_id));

        let outcome = match entry.enqueue(request.clone()) {
            Err(QueueError::Closed) => {
                let fresh = self.new_session(channel_id, guild_id);
                let outcome = fresh.enqueue(request)?;
                *entry = fresh;
                outcome
            }
            other => other?,
        };
        let session = entry.value().clone();
        drop(entry);

        if session.claim_driver() {
            self.spawn_driver(session.clone());
        }
        Ok((session, outcome))
    }

    fn spawn_driver(self: &Arc<Self>, session: Arc<Session>) {
        let registry = self.clone();
        let ctx = DriverCtx {
            session: session.clone(),
            fetcher: self.fetcher.clone(),
            sink: self.sink.clone(),
            fetch_retries: self.fetch_retries,
        };
        self.drivers.spawn(async move {
            run_driver(ctx).await;
            registry.release(&session).await;
        });
    }

    /// Drops `session` from the map if it is still the registered one and
    /// tells the sink to leave when no newer session took the channel.
    async fn release(&self, session: &Arc<Session>) {
        let channel_id = session.channel_id;
        let removed = self
            .sessions
            .remove_if(&channel_id, |_, s| Arc::ptr_eq(s, session))
            .is_some();

        if removed && !self.sessions.contains_key(&channel_id) {
            self.sink.leave(channel_id).await;
        }
        info!("Session for channel {} destroyed", channel_id);
    }

    pub fn get(&self, channel_id: ChannelId) -> Option<Arc<Session>> {
        self.sessions.get(&channel_id).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions currently playing or paused.
    pub fn active(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.current().is_some())
            .count()
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> =
            self.sessions.iter().map(|s| s.snapshot()).collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Stops every session and waits for their drivers to exit.
    pub async fn shutdown(&self) {
        info!("Stopping {} sessions", self.sessions.len());
        self.shutdown.cancel();
        for session in self.sessions.iter() {
            session.stop();
        }
        self.drivers.close();
        self.drivers.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        common::{Severity, types::UserId},
        media::{MediaFetchError, fakes::ScriptedFetcher},
        player::PlaybackState,
        protocol::{OutgoingMessage, PlayerEvent, TrackEndReason},
        sink::fakes::{Behaviour, ScriptedSink},
    };

    const CHANNEL: ChannelId = ChannelId(444444444444444444);

    struct Harness {
        registry: Arc<SessionRegistry>,
        fetcher: Arc<ScriptedFetcher>,
        sink: Arc<ScriptedSink>,
        events: tokio::sync::broadcast::Receiver<OutgoingMessage>,
    }

    fn harness(fetch: Vec<Result<(), MediaFetchError>>, sink: ScriptedSink) -> Harness {
        harness_with(ScriptedFetcher::new(fetch), sink)
    }

    fn harness_with(fetcher: ScriptedFetcher, sink: ScriptedSink) -> Harness {
        let mut config = Config::default();
        config.player.max_queue_length = 10;
        let fetcher = Arc::new(fetcher);
        let sink = Arc::new(sink);
        let hub = EventHub::new();
        let events = hub.subscribe();
        let registry = SessionRegistry::new(&config, fetcher.clone(), sink.clone(), hub);
        Harness {
            registry,
            fetcher,
            sink,
            events,
        }
    }

    fn request(locator: &str) -> PlaybackRequest {
        PlaybackRequest::new(locator, UserId(1), "tester", ChannelId(2))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..300 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    fn events(rx: &mut tokio::sync::broadcast::Receiver<OutgoingMessage>) -> Vec<PlayerEvent> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let OutgoingMessage::Event { event } = message {
                out.push(event);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_one_session_per_channel() {
        let h = harness(vec![], ScriptedSink::new(vec![], Behaviour::Hang));

        let (first, outcome) = h
            .registry
            .enqueue(CHANNEL, None, request("A"))
            .expect("enqueue");
        assert_eq!(outcome, EnqueueOutcome::Started);
        let (second, outcome) = h
            .registry
            .enqueue(CHANNEL, None, request("B"))
            .expect("enqueue");
        assert_eq!(outcome, EnqueueOutcome::Queued { position: 1 });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(h.registry.len(), 1);

        h.registry.shutdown().await;
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn test_queue_plays_in_order_then_session_is_destroyed() {
        let h = harness(vec![], ScriptedSink::new(vec![], Behaviour::Play(5)));
        for locator in ["A", "B", "C"] {
            h.registry
                .enqueue(CHANNEL, None, request(locator))
                .expect("enqueue");
        }

        let sink = h.sink.clone();
        wait_until(|| sink.left() == vec![CHANNEL]).await;
        assert_eq!(h.sink.played(), vec!["A", "B", "C"]);
        assert!(h.registry.get(CHANNEL).is_none());
    }

    #[tokio::test]
    async fn test_skip_moves_to_next_request() {
        let h = harness(
            vec![],
            ScriptedSink::new(vec![Behaviour::Hang], Behaviour::Hang),
        );
        let (session, _) = h
            .registry
            .enqueue(CHANNEL, None, request("A"))
            .expect("enqueue");
        h.registry
            .enqueue(CHANNEL, None, request("B"))
            .expect("enqueue");

        let sink = h.sink.clone();
        wait_until(|| sink.played().len() == 1).await;

        let skipped = session.skip().expect("A is playing");
        assert_eq!(skipped.locator, "A");
        assert_eq!(session.snapshot().pending.len(), 0);
        assert_eq!(
            session.current().map(|r| r.locator),
            Some("B".to_string())
        );

        wait_until(|| sink.played().len() == 2).await;
        assert_eq!(session.state(), PlaybackState::Playing);
        h.registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_disconnect_discards_queue_and_destroys_session() {
        let h = harness(
            vec![],
            ScriptedSink::new(vec![Behaviour::Disconnect], Behaviour::Play(5)),
        );
        for locator in ["A", "B", "C"] {
            h.registry
                .enqueue(CHANNEL, None, request(locator))
                .expect("enqueue");
        }

        let sink = h.sink.clone();
        wait_until(|| sink.left() == vec![CHANNEL]).await;
        assert_eq!(h.sink.played(), vec!["A"]);
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_surfaced_and_queue_advances() {
        let mut h = harness(
            vec![
                Err(MediaFetchError::Timeout),
                Err(MediaFetchError::Timeout),
            ],
            ScriptedSink::new(vec![], Behaviour::Play(5)),
        );
        for locator in ["bad", "good"] {
            h.registry
                .enqueue(CHANNEL, None, request(locator))
                .expect("enqueue");
        }

        let sink = h.sink.clone();
        wait_until(|| !sink.left().is_empty()).await;

        // One retry for "bad", then one attempt for "good".
        assert_eq!(h.fetcher.calls(), 3);
        assert_eq!(h.sink.played(), vec!["good"]);

        let events = events(&mut h.events);
        assert!(matches!(
            events.first(),
            Some(PlayerEvent::TrackException { .. })
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            PlayerEvent::TrackEnd { reason: TrackEndReason::LoadFailed, track, .. } if track.locator == "bad"
        )));
        assert!(matches!(
            events.last(),
            Some(PlayerEvent::QueueFinished { .. })
        ));
    }

    #[tokio::test]
    async fn test_decode_error_is_a_fault_and_queue_advances() {
        let mut h = harness(
            vec![],
            ScriptedSink::new(vec![Behaviour::DecodeError], Behaviour::Play(5)),
        );
        for locator in ["corrupt", "good"] {
            h.registry
                .enqueue(CHANNEL, None, request(locator))
                .expect("enqueue");
        }

        let sink = h.sink.clone();
        wait_until(|| !sink.left().is_empty()).await;
        assert_eq!(h.sink.played(), vec!["corrupt", "good"]);

        let events = events(&mut h.events);
        let corrupt: Vec<_> = events
            .iter()
            .filter(|e| match e {
                PlayerEvent::TrackStart { track, .. }
                | PlayerEvent::TrackEnd { track, .. }
                | PlayerEvent::TrackException { track, .. } => track.locator == "corrupt",
                _ => false,
            })
            .collect();
        assert!(matches!(
            corrupt.as_slice(),
            [
                PlayerEvent::TrackStart { .. },
                PlayerEvent::TrackException { exception, .. },
                PlayerEvent::TrackEnd { reason: TrackEndReason::LoadFailed, .. },
            ] if exception.severity == Severity::Fault
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            PlayerEvent::TrackEnd { reason: TrackEndReason::Finished, track, .. } if track.locator == "good"
        )));
    }

    #[tokio::test]
    async fn test_skip_during_fetch_cancels_download() {
        let mut h = harness_with(
            ScriptedFetcher::default().hanging_on("slow"),
            ScriptedSink::new(vec![], Behaviour::Play(5)),
        );
        let (session, _) = h
            .registry
            .enqueue(CHANNEL, None, request("slow"))
            .expect("enqueue");
        h.registry
            .enqueue(CHANNEL, None, request("next"))
            .expect("enqueue");

        let fetcher = h.fetcher.clone();
        wait_until(|| fetcher.calls() == 1).await;
        assert_eq!(session.skip().expect("slow is current").locator, "slow");

        let sink = h.sink.clone();
        wait_until(|| !sink.left().is_empty()).await;
        assert_eq!(h.sink.played(), vec!["next"]);

        let events = events(&mut h.events);
        assert!(!events.iter().any(|e| matches!(
            e,
            PlayerEvent::TrackStart { track, .. } if track.locator == "slow"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            PlayerEvent::TrackEnd { reason: TrackEndReason::Skipped, track, .. } if track.locator == "slow"
        )));
    }

    #[tokio::test]
    async fn test_stop_during_fetch_drains_session() {
        let mut h = harness_with(
            ScriptedFetcher::default().hanging_on("slow"),
            ScriptedSink::new(vec![], Behaviour::Play(5)),
        );
        let (session, _) = h
            .registry
            .enqueue(CHANNEL, None, request("slow"))
            .expect("enqueue");
        h.registry
            .enqueue(CHANNEL, None, request("never"))
            .expect("enqueue");

        let fetcher = h.fetcher.clone();
        wait_until(|| fetcher.calls() == 1).await;
        assert_eq!(session.stop(), 2);

        let sink = h.sink.clone();
        wait_until(|| !sink.left().is_empty()).await;
        assert!(h.sink.played().is_empty());
        assert!(h.registry.is_empty());
        assert_eq!(h.fetcher.calls(), 1);

        let events = events(&mut h.events);
        assert!(!events
            .iter()
            .any(|e| matches!(e, PlayerEvent::TrackStart { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            PlayerEvent::TrackEnd { reason: TrackEndReason::Stopped, track, .. } if track.locator == "slow"
        )));
    }

    #[tokio::test]
    async fn test_enqueue_after_destroy_creates_new_session() {
        let h = harness(vec![], ScriptedSink::new(vec![], Behaviour::Play(5)));
        let (first, _) = h
            .registry
            .enqueue(CHANNEL, None, request("A"))
            .expect("enqueue");

        let sink = h.sink.clone();
        wait_until(|| sink.left().len() == 1).await;
        assert!(first.is_closed());

        let (second, outcome) = h
            .registry
            .enqueue(CHANNEL, None, request("B"))
            .expect("enqueue");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(outcome, EnqueueOutcome::Started);
        wait_until(|| sink.left().len() == 2).await;
        assert_eq!(h.sink.played(), vec!["A", "B"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueues_are_never_lost() {
        let h = harness(vec![], ScriptedSink::new(vec![], Behaviour::Play(1)));
        let mut tasks = Vec::new();
        for i in 0..10 {
            let registry = h.registry.clone();
            tasks.push(tokio::spawn(async move {
                registry
                    .enqueue(CHANNEL, None, request(&i.to_string()))
                    .map(|_| ())
            }));
        }
        for task in tasks {
            task.await.expect("task").expect("enqueue");
        }

        let sink = h.sink.clone();
        let registry = h.registry.clone();
        wait_until(|| sink.played().len() == 10 && registry.is_empty()).await;
    }

    #[tokio::test]
    async fn test_queue_full_is_rejected() {
        let h = harness(vec![], ScriptedSink::new(vec![], Behaviour::Hang));
        h.registry
            .enqueue(CHANNEL, None, request("now"))
            .expect("enqueue");
        for i in 0..10 {
            h.registry
                .enqueue(CHANNEL, None, request(&i.to_string()))
                .expect("within limit");
        }
        assert_eq!(
            h.registry
                .enqueue(CHANNEL, None, request("over"))
                .map(|(_, o)| o),
            Err(QueueError::Full { limit: 10 })
        );
        h.registry.shutdown().await;
    }
}
