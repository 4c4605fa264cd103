use tokio::sync::broadcast;
use tracing::trace;

use super::events::{OutgoingMessage, PlayerEvent};
use crate::command::Reply;
use crate::common::types::ChannelId;

const HUB_CAPACITY: usize = 1024;

/// Fan-out of outgoing messages to every websocket subscriber.
///
/// Publishing never blocks. Subscribers that fall behind skip ahead.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<OutgoingMessage>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutgoingMessage> {
        self.tx.subscribe()
    }

    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, message: OutgoingMessage) {
        // No subscribers is not an error.
        if self.tx.send(message).is_err() {
            trace!("dropped outgoing message: no subscribers");
        }
    }

    pub fn event(&self, event: PlayerEvent) {
        self.publish(OutgoingMessage::Event { event });
    }

    pub fn reply(&self, channel_id: ChannelId, reply: Reply) {
        self.publish(OutgoingMessage::Reply { channel_id, reply });
    }

    pub fn devlog(&self, channel_id: ChannelId, content: impl Into<String>) {
        self.publish(OutgoingMessage::Devlog {
            channel_id,
            content: content.into(),
        });
    }
}
