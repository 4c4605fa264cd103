use std::{net::SocketAddr, sync::Arc};

use project_em::{
    bot::Bot,
    common::{
        AnyResult,
        banner::{BannerInfo, print_banner},
        logger,
    },
    configs::Config,
    media::HttpFetcher,
    monitoring::StatsCollector,
    protocol::EventHub,
    server::{AppState, SessionRegistry},
    sink::{PacedSink, VoiceBridge},
    transport,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let (config, path) = Config::load()?;
    logger::init(&config);
    print_banner(&config.bot.name, &BannerInfo::default());

    match path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No config.toml found, using defaults and environment"),
    }
    if config.server.password.is_empty() {
        warn!("server.password is empty; requests without a password will be accepted");
    }

    let config = Arc::new(config);
    let hub = EventHub::new();
    let bridge = Arc::new(VoiceBridge::new());

    let fetcher = Arc::new(HttpFetcher::new(&config.audio)?);
    let sink = Arc::new(PacedSink::new(bridge.clone(), config.audio.frame_duration_ms));
    let registry = SessionRegistry::new(&config, fetcher, sink, hub.clone());
    let stats = Arc::new(StatsCollector::new());
    let bot = Bot::new(config.clone(), registry.clone(), stats.clone())?;

    let state = Arc::new(AppState {
        config: config.clone(),
        bot,
        registry: registry.clone(),
        hub,
        bridge,
        stats,
    });

    let app = transport::router(state.clone());
    let ip: std::net::IpAddr = config.server.host.parse()?;
    let address = SocketAddr::from((ip, config.server.port));
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("{} listening on {}", config.bot.name, address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.shutdown().await;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
