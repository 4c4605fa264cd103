use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AudioConfig {
    /// Largest media body accepted from a locator, in bytes.
    #[serde(default = "default_max_download_size")]
    pub max_download_size: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    /// Extra attempts after a transient fetch failure.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_download_size: default_max_download_size(),
            download_timeout_secs: default_download_timeout_secs(),
            fetch_retries: default_fetch_retries(),
            frame_duration_ms: default_frame_duration_ms(),
        }
    }
}

fn default_max_download_size() -> u64 {
    20 * 1024 * 1024
}

fn default_download_timeout_secs() -> u64 {
    600
}

fn default_fetch_retries() -> u32 {
    1
}

fn default_frame_duration_ms() -> u64 {
    20
}
