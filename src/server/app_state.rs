use std::sync::Arc;

use crate::{
    bot::Bot, configs::Config, monitoring::StatsCollector, protocol::EventHub,
    server::SessionRegistry, sink::VoiceBridge,
};

/// Top-level application state shared by every route.
pub struct AppState {
    pub config: Arc<Config>,
    pub bot: Bot,
    pub registry: Arc<SessionRegistry>,
    pub hub: EventHub,
    /// Voice bridges attached over `/v1/voice/{channel_id}`.
    pub bridge: Arc<VoiceBridge>,
    pub stats: Arc<StatsCollector>,
}
