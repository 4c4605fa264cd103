use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::debug;

use super::{Media, MediaFetchError, MediaFetcher, MediaInfo, locator};
use crate::{audio::demux::open_format, common::types::AudioFormat, configs::AudioConfig};

const DEFAULT_USER_AGENT: &str = concat!("project-em/", env!("CARGO_PKG_VERSION"));

/// Downloads http(s) locators into memory, bounded by size and time.
pub struct HttpFetcher {
    client: Client,
    max_size: u64,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &AudioConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            max_size: config.max_download_size,
            timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    async fn download(&self, url: &str) -> Result<(BytesMut, Option<String>), MediaFetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaFetchError::Status(status.as_u16()));
        }

        if let Some(size) = response.content_length() {
            if size > self.max_size {
                return Err(MediaFetchError::TooLarge {
                    size,
                    limit: self.max_size,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest)?;
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_size {
                return Err(MediaFetchError::TooLarge {
                    size,
                    limit: self.max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok((body, content_type))
    }
}

fn map_reqwest(e: reqwest::Error) -> MediaFetchError {
    if e.is_timeout() {
        MediaFetchError::Timeout
    } else if e.is_builder() {
        MediaFetchError::InvalidLocator(e.to_string())
    } else {
        MediaFetchError::Network(e.to_string())
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Media, MediaFetchError> {
        locator::check(url)?;
        debug!("Downloading {}", url);

        let (body, content_type) = tokio::time::timeout(self.timeout, self.download(url))
            .await
            .map_err(|_| MediaFetchError::Timeout)??;

        let format = match content_type.as_deref().map(AudioFormat::from_mime) {
            Some(format) if format != AudioFormat::Unknown => format,
            _ => AudioFormat::from_url(url),
        };

        let bytes = body.freeze();
        let size = bytes.len() as u64;
        let probe_bytes = bytes.clone();

        // Probing reads the container header synchronously.
        let demuxed = tokio::task::spawn_blocking(move || open_format(probe_bytes, format))
            .await
            .map_err(|e| MediaFetchError::Unsupported(e.to_string()))?
            .map_err(|e| MediaFetchError::Unsupported(e.to_string()))?;

        let info = MediaInfo {
            title: demuxed
                .title
                .clone()
                .unwrap_or_else(|| locator::display_name(url)),
            duration: demuxed.duration_ms,
            codec: demuxed.codec.map(str::to_string),
            sample_rate: Some(demuxed.sample_rate),
            channels: Some(demuxed.channels),
            size,
        };

        debug!(
            "Downloaded {} ({} bytes, {})",
            info.title,
            size,
            info.codec.as_deref().unwrap_or("unknown codec")
        );

        Ok(Media {
            locator: url.to_string(),
            format,
            bytes,
            info,
        })
    }
}
