//! Audio sinks: where a session's decoded audio goes.

use std::sync::{Arc, atomic::AtomicU64};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub mod bridge;
pub mod paced;

pub use bridge::VoiceBridge;
pub use paced::PacedSink;

use crate::{common::types::ChannelId, media::Media};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The voice connection went away. Fatal to the session.
    #[error("audio sink disconnected")]
    Disconnected,

    /// The track could not be decoded. Only this track is affected.
    #[error("failed to decode track: {0}")]
    Decode(String),
}

/// Per-track handles shared between a session and its sink.
#[derive(Debug, Clone)]
pub struct TrackControl {
    /// `true` while the session is paused.
    pub paused: watch::Receiver<bool>,
    /// Fires on skip, stop or shutdown.
    pub cancel: CancellationToken,
    /// Milliseconds of audio delivered so far.
    pub position: Arc<AtomicU64>,
}

#[async_trait]
pub trait AudioSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Streams `media` into `channel_id` until it ends or `control.cancel`
    /// fires. Returns `Ok(())` in both cases.
    async fn play(
        &self,
        channel_id: ChannelId,
        media: Media,
        control: TrackControl,
    ) -> Result<(), SinkError>;

    /// Leaves the voice channel. Called once when a session is destroyed.
    async fn leave(&self, _channel_id: ChannelId) {}
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::{collections::VecDeque, sync::atomic::Ordering};

    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Behaviour {
        /// Plays for the given number of milliseconds, honouring cancel.
        Play(u64),
        /// Plays until cancelled.
        Hang,
        Disconnect,
        DecodeError,
    }

    /// Sink that follows a script per track and records what it was asked to do.
    pub struct ScriptedSink {
        script: Mutex<VecDeque<Behaviour>>,
        fallback: Behaviour,
        pub played: Mutex<Vec<String>>,
        pub left: Mutex<Vec<ChannelId>>,
    }

    impl ScriptedSink {
        pub fn new(script: Vec<Behaviour>, fallback: Behaviour) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                played: Mutex::new(Vec::new()),
                left: Mutex::new(Vec::new()),
            }
        }

        pub fn played(&self) -> Vec<String> {
            self.played.lock().clone()
        }

        pub fn left(&self) -> Vec<ChannelId> {
            self.left.lock().clone()
        }
    }

    #[async_trait]
    impl AudioSink for ScriptedSink {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn play(
            &self,
            _channel_id: ChannelId,
            media: Media,
            control: TrackControl,
        ) -> Result<(), SinkError> {
            self.played.lock().push(media.locator.clone());
            let behaviour = self.script.lock().pop_front().unwrap_or(self.fallback);
            match behaviour {
                Behaviour::Play(ms) => {
                    tokio::select! {
                        _ = control.cancel.cancelled() => {}
                        _ = tokio::time::sleep(std::time::Duration::from_millis(ms)) => {
                            control.position.store(ms, Ordering::Release);
                        }
                    }
                    Ok(())
                }
                Behaviour::Hang => {
                    control.cancel.cancelled().await;
                    Ok(())
                }
                Behaviour::Disconnect => Err(SinkError::Disconnected),
                Behaviour::DecodeError => Err(SinkError::Decode("bad frame".into())),
            }
        }

        async fn leave(&self, channel_id: ChannelId) {
            self.left.lock().push(channel_id);
        }
    }
}
