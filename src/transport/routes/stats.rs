use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::{common::banner::BannerInfo, monitoring::Stats, server::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub commit: &'static str,
    pub build_time: String,
    pub sink: &'static str,
    pub commands: usize,
}

/// GET /v1/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    tracing::debug!("GET /v1/stats");
    Json(state.stats.collect(&state.registry))
}

/// GET /version
pub async fn get_version(State(state): State<Arc<AppState>>) -> Json<VersionInfo> {
    let info = BannerInfo::default();
    Json(VersionInfo {
        version: info.version,
        branch: info.branch,
        commit: info.commit_short,
        build_time: info.build_time(),
        sink: state.registry.sink_name(),
        commands: state.bot.router().len(),
    })
}
