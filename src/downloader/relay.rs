//! Secondary backend: a relay service that resolves Spotify URLs itself.
//!
//! The relay publishes a request rate limit, so a fixed delay is observed
//! before every request made against it. Unlike the mirror CDN it answers
//! failures with proper error statuses, so a status check is sufficient.

use crate::downloader::{DownloadedAudio, Downloader};
use crate::errors::{AppError, Result};
use crate::track::Track;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const RELAY_BASE: &str = "https://api.spotify-relay.net";
/// Published limit: one request per 1.5 seconds.
const PRE_REQUEST_DELAY: Duration = Duration::from_millis(1500);
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";

#[derive(Debug, Deserialize)]
struct RelayResolve {
    success: bool,
    url: Option<String>,
}

pub struct RelayDownloader {
    client: Client,
    base: String,
    delay: Duration,
}

impl RelayDownloader {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base: RELAY_BASE.to_string(),
            delay: PRE_REQUEST_DELAY,
        }
    }

    async fn throttled_get(&self, url: &str) -> Result<reqwest::Response> {
        tokio::time::sleep(self.delay).await;
        Ok(self.client.get(url).send().await?)
    }

    async fn fetch_cover(&self, track: &Track) -> Option<Vec<u8>> {
        let url = track.cover_url.as_deref()?;
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                response.bytes().await.ok().map(|b| b.to_vec())
            }
            Ok(response) => {
                warn!("Cover art request returned {}", response.status());
                None
            }
            Err(e) => {
                warn!("Cover art download failed: {}", e);
                None
            }
        }
    }
}

impl Default for RelayDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Downloader for RelayDownloader {
    async fn fetch_audio(&self, track: &Track) -> Result<DownloadedAudio> {
        let resolve_url = format!(
            "{}/api/track?url={}",
            self.base,
            urlencoding::encode(&track.url)
        );

        debug!("Resolving '{}' via relay", track.title);
        let response = self.throttled_get(&resolve_url).await?;
        if !response.status().is_success() {
            return Err(AppError::Backend(format!(
                "relay resolve for '{}' failed with status {}",
                track.title,
                response.status()
            )));
        }

        let resolved: RelayResolve = response.json().await?;
        let audio_url = match (resolved.success, resolved.url) {
            (true, Some(url)) => url,
            _ => {
                return Err(AppError::Backend(format!(
                    "relay has no download for '{}' ({})",
                    track.title, track.id
                )))
            }
        };

        let response = self.throttled_get(&audio_url).await?;
        if !response.status().is_success() {
            return Err(AppError::Backend(format!(
                "relay audio request for '{}' failed with status {}",
                track.title,
                response.status()
            )));
        }
        let bytes = response.bytes().await?.to_vec();

        let cover = self.fetch_cover(track).await;

        Ok(DownloadedAudio { bytes, cover })
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}
