use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    AudioSink, SinkError, TrackControl,
    bridge::{Delivery, VoiceBridge},
};
use crate::{
    audio::{AudioProcessor, PcmFrame, constants::FRAME_CHANNEL_CAPACITY, open_format},
    common::types::ChannelId,
    media::Media,
};

enum StreamEnd {
    Drained,
    Cancelled,
}

/// Decodes on a blocking thread and writes frames to the voice bridge in real
/// time, one every `frame_ms`.
pub struct PacedSink {
    bridge: Arc<VoiceBridge>,
    frame_ms: u64,
}

impl PacedSink {
    pub fn new(bridge: Arc<VoiceBridge>, frame_ms: u64) -> Self {
        Self { bridge, frame_ms }
    }

    async fn stream(
        &self,
        channel_id: ChannelId,
        frames: flume::Receiver<PcmFrame>,
        control: &TrackControl,
    ) -> Result<StreamEnd, SinkError> {
        let mut interval = tokio::time::interval(Duration::from_millis(self.frame_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut paused = control.paused.clone();
        let mut delivered_any = false;
        let mut dropped: u64 = 0;
        let mut position = 0u64;

        loop {
            if *paused.borrow_and_update() {
                tokio::select! {
                    _ = control.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                    changed = paused.changed() => {
                        if changed.is_err() {
                            return Ok(StreamEnd::Cancelled);
                        }
                        interval.reset();
                        continue;
                    }
                }
            }

            let frame = tokio::select! {
                biased;
                _ = control.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                frame = frames.recv_async() => match frame {
                    Ok(frame) => frame,
                    Err(_) => break,
                },
            };

            tokio::select! {
                biased;
                _ = control.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                _ = interval.tick() => {}
            }

            match self.bridge.send(channel_id, &frame) {
                Delivery::Sent => delivered_any = true,
                Delivery::Dropped => dropped += 1,
                Delivery::NoBridge if !delivered_any => {}
                Delivery::NoBridge | Delivery::Closed => {
                    warn!("Voice bridge for {} went away mid-stream", channel_id);
                    return Err(SinkError::Disconnected);
                }
            }

            position += self.frame_ms;
            control.position.store(position, Ordering::Release);
        }

        if dropped > 0 {
            debug!("{} frames dropped for slow bridge in {}", dropped, channel_id);
        }
        Ok(StreamEnd::Drained)
    }
}

#[async_trait]
impl AudioSink for PacedSink {
    fn name(&self) -> &'static str {
        "voice-bridge"
    }

    async fn play(
        &self,
        channel_id: ChannelId,
        media: Media,
        control: TrackControl,
    ) -> Result<(), SinkError> {
        let (frame_tx, frame_rx) = flume::bounded(FRAME_CHANNEL_CAPACITY);
        let decode_cancel: CancellationToken = control.cancel.child_token();
        let stop_decoder = decode_cancel.clone().drop_guard();
        let frame_ms = self.frame_ms;

        let decoder = tokio::task::spawn_blocking(move || -> Result<(), String> {
            let demuxed = open_format(media.bytes, media.format).map_err(|e| e.to_string())?;
            let mut processor = AudioProcessor::new(demuxed, frame_ms).map_err(|e| e.to_string())?;
            processor
                .run(&frame_tx, &decode_cancel)
                .map_err(|e| e.to_string())
        });

        let end = self.stream(channel_id, frame_rx, &control).await;
        drop(stop_decoder);

        match end? {
            StreamEnd::Cancelled => Ok(()),
            StreamEnd::Drained => match decoder.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(SinkError::Decode(e)),
                Err(e) => Err(SinkError::Decode(e.to_string())),
            },
        }
    }

    async fn leave(&self, channel_id: ChannelId) {
        self.bridge.close(channel_id);
    }
}
