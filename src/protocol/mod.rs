pub mod events;
pub mod hub;

pub use events::{OutgoingMessage, PlayerEvent, TrackEndReason, TrackException};
pub use hub::EventHub;
