//! Fetching media from locators.
//!
//! A [`MediaFetcher`] turns a locator into a fully downloaded and probed
//! [`Media`]. [`fetch_with_retry`] adds the retry policy for transient failures.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub mod backoff;
pub mod http;
pub mod locator;

pub use backoff::Backoff;
pub use http::HttpFetcher;

use crate::common::types::AudioFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaFetchError {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    #[error("unsupported media: {0}")]
    Unsupported(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("media is {size} bytes, the limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("download timed out")]
    Timeout,
}

impl MediaFetchError {
    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::InvalidLocator(_) | Self::Unsupported(_) | Self::TooLarge { .. } => false,
        }
    }
}

/// What probing found out about a download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub title: String,
    /// Milliseconds; `None` when the container does not say.
    pub duration: Option<u64>,
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
    /// Download size in bytes.
    pub size: u64,
}

/// A downloaded track ready for decoding.
#[derive(Debug, Clone)]
pub struct Media {
    pub locator: String,
    pub format: AudioFormat,
    pub bytes: Bytes,
    pub info: MediaInfo,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Media, MediaFetchError>;
}

/// Fetches `locator`, retrying transient failures up to `retries` more times.
pub async fn fetch_with_retry(
    fetcher: &dyn MediaFetcher,
    locator: &str,
    retries: u32,
) -> Result<Media, MediaFetchError> {
    let mut backoff = Backoff::new(retries);
    loop {
        match fetcher.fetch(locator).await {
            Ok(media) => return Ok(media),
            Err(e) if e.is_retryable() && !backoff.is_exhausted() => {
                let delay = backoff.next();
                warn!(
                    "Fetching {} failed ({}), retrying in {}ms",
                    locator,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use parking_lot::Mutex;

    use super::*;

    /// Replays scripted results, then succeeds with silence-sized payloads.
    #[derive(Default)]
    pub struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<(), MediaFetchError>>>,
        /// Locators whose download never completes.
        hanging: Vec<String>,
        pub calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        pub fn new(script: Vec<Result<(), MediaFetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                hanging: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn hanging_on(mut self, locator: &str) -> Self {
            self.hanging.push(locator.to_string());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub fn media(locator: &str) -> Media {
        Media {
            locator: locator.to_string(),
            format: AudioFormat::Unknown,
            bytes: Bytes::new(),
            info: MediaInfo {
                title: locator.to_string(),
                ..Default::default()
            },
        }
    }

    #[async_trait]
    impl MediaFetcher for ScriptedFetcher {
        async fn fetch(&self, locator: &str) -> Result<Media, MediaFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hanging.iter().any(|l| l == locator) {
                std::future::pending::<()>().await;
            }
            let next = self.script.lock().pop_front().unwrap_or(Ok(()));
            next.map(|()| media(locator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{fakes::ScriptedFetcher, *};

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let fetcher = ScriptedFetcher::new(vec![Err(MediaFetchError::Timeout)]);
        let media = fetch_with_retry(&fetcher, "https://a.example/x.mp3", 1)
            .await
            .expect("second attempt succeeds");
        assert_eq!(media.locator, "https://a.example/x.mp3");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(MediaFetchError::Status(503)),
            Err(MediaFetchError::Status(503)),
            Err(MediaFetchError::Status(503)),
        ]);
        let err = fetch_with_retry(&fetcher, "https://a.example/x.mp3", 1)
            .await
            .expect_err("both attempts fail");
        assert_eq!(err, MediaFetchError::Status(503));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![Err(MediaFetchError::Status(404))]);
        fetch_with_retry(&fetcher, "https://a.example/x.mp3", 1)
            .await
            .expect_err("404 is final");
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(MediaFetchError::Network("reset".into()).is_retryable());
        assert!(MediaFetchError::Status(429).is_retryable());
        assert!(!MediaFetchError::Status(403).is_retryable());
        assert!(!MediaFetchError::TooLarge { size: 2, limit: 1 }.is_retryable());
    }
}
