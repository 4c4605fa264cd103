use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::{audio::constants::BYTES_PER_SAMPLE, common::types::ChannelId};

/// Frames queued per bridge before the writer starts dropping.
const BRIDGE_QUEUE_FRAMES: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No bridge is attached for the channel.
    NoBridge,
    /// The bridge fell behind; this frame was dropped.
    Dropped,
    /// The attached bridge went away.
    Closed,
}

struct Attachment {
    id: u64,
    tx: flume::Sender<Bytes>,
}

/// Voice bridges attached over websocket, one per voice channel.
#[derive(Default)]
pub struct VoiceBridge {
    attached: DashMap<ChannelId, Attachment>,
    next_id: AtomicU64,
}

impl VoiceBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a bridge for `channel_id`, replacing any previous one.
    ///
    /// Returns the attachment id for [`detach`](Self::detach) and the frame
    /// receiver. The receiver closes when the session leaves the channel.
    pub fn attach(&self, channel_id: ChannelId) -> (u64, flume::Receiver<Bytes>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = flume::bounded(BRIDGE_QUEUE_FRAMES);
        if self
            .attached
            .insert(channel_id, Attachment { id, tx })
            .is_some()
        {
            info!("Voice bridge for {} replaced", channel_id);
        }
        (id, rx)
    }

    /// Removes attachment `id` if it is still the current one.
    pub fn detach(&self, channel_id: ChannelId, id: u64) {
        if self
            .attached
            .remove_if(&channel_id, |_, a| a.id == id)
            .is_some()
        {
            debug!("Voice bridge for {} detached", channel_id);
        }
    }

    /// Drops whatever bridge is attached to `channel_id`.
    pub fn close(&self, channel_id: ChannelId) {
        self.attached.remove(&channel_id);
    }

    pub fn is_attached(&self, channel_id: ChannelId) -> bool {
        self.attached.contains_key(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    pub fn send(&self, channel_id: ChannelId, frame: &[i16]) -> Delivery {
        let Some(attachment) = self.attached.get(&channel_id) else {
            return Delivery::NoBridge;
        };

        match attachment.tx.try_send(encode_frame(frame)) {
            Ok(()) => Delivery::Sent,
            Err(flume::TrySendError::Full(_)) => Delivery::Dropped,
            Err(flume::TrySendError::Disconnected(_)) => {
                let id = attachment.id;
                drop(attachment);
                self.detach(channel_id, id);
                Delivery::Closed
            }
        }
    }
}

/// Interleaved s16le bytes for one frame.
pub fn encode_frame(frame: &[i16]) -> Bytes {
    let mut buf = vec![0u8; frame.len() * BYTES_PER_SAMPLE];
    LittleEndian::write_i16_into(frame, &mut buf);
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_little_endian() {
        let bytes = encode_frame(&[1, -2, 0x1234]);
        assert_eq!(&bytes[..], &[0x01, 0x00, 0xFE, 0xFF, 0x34, 0x12]);
    }

    #[test]
    fn test_send_without_bridge() {
        let bridge = VoiceBridge::new();
        assert_eq!(bridge.send(ChannelId(1), &[0; 4]), Delivery::NoBridge);
    }

    #[test]
    fn test_send_and_close() {
        let bridge = VoiceBridge::new();
        let (_, rx) = bridge.attach(ChannelId(1));
        assert_eq!(bridge.send(ChannelId(1), &[5, 6]), Delivery::Sent);
        assert_eq!(rx.try_recv().map(|b| b.len()), Ok(4));

        drop(rx);
        assert_eq!(bridge.send(ChannelId(1), &[5, 6]), Delivery::Closed);
        assert!(!bridge.is_attached(ChannelId(1)));
    }

    #[test]
    fn test_stale_detach_keeps_newer_bridge() {
        let bridge = VoiceBridge::new();
        let (old, _old_rx) = bridge.attach(ChannelId(1));
        let (_new, _new_rx) = bridge.attach(ChannelId(1));
        bridge.detach(ChannelId(1), old);
        assert!(bridge.is_attached(ChannelId(1)));
    }
}
