//! Primary backend: the mirror download API.
//!
//! CDN links returned by the mirror expire quickly, so the track lookup is
//! repeated immediately before the byte fetch rather than reusing the link
//! from the initial metadata pass. The CDN sometimes answers HTTP 200 with
//! an HTML error page instead of audio; that is detected by inspecting the
//! payload shape, not just the status code.

use crate::api::{ApiClient, FetchedBody};
use crate::downloader::{DownloadedAudio, Downloader};
use crate::errors::{AppError, Result};
use crate::track::Track;
use log::{debug, warn};

pub struct MirrorDownloader {
    api: ApiClient,
}

impl MirrorDownloader {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn fetch_cover(&self, cover_url: Option<&str>) -> Option<Vec<u8>> {
        let url = cover_url?;
        match self.api.fetch_body(url).await {
            Ok(body) if body.status.is_success() => Some(body.bytes),
            Ok(body) => {
                warn!("Cover art request returned {}", body.status);
                None
            }
            Err(e) => {
                warn!("Cover art download failed: {}", e);
                None
            }
        }
    }
}

/// An HTML-shaped payload is a soft failure regardless of HTTP status.
fn looks_like_html(body: &FetchedBody) -> bool {
    if let Some(content_type) = &body.content_type {
        if content_type.contains("text/html") {
            return true;
        }
    }

    let head: &[u8] = &body.bytes[..body.bytes.len().min(64)];
    let head = String::from_utf8_lossy(head);
    let trimmed = head.trim_start().to_ascii_lowercase();
    trimmed.starts_with("<!doctype") || trimmed.starts_with("<html")
}

#[async_trait::async_trait]
impl Downloader for MirrorDownloader {
    async fn fetch_audio(&self, track: &Track) -> Result<DownloadedAudio> {
        // Fresh lookup; the link handed out earlier may have expired.
        let lookup = self.api.lookup_track(&track.id).await?;

        if !lookup.success {
            return Err(AppError::Backend(format!(
                "mirror has no download for '{}' ({})",
                track.title, track.id
            )));
        }

        let link = lookup.link.ok_or_else(|| {
            AppError::Backend(format!(
                "mirror response for '{}' carries no download link",
                track.title
            ))
        })?;

        debug!("Fetching audio for '{}' from {}", track.title, link);
        let body = self.api.fetch_body(&link).await?;

        if !body.status.is_success() {
            return Err(AppError::Backend(format!(
                "audio request for '{}' failed with status {}",
                track.title, body.status
            )));
        }

        if looks_like_html(&body) {
            return Err(AppError::Backend(format!(
                "mirror returned an HTML error page instead of audio for '{}'",
                track.title
            )));
        }

        let cover_url = lookup
            .metadata
            .as_ref()
            .and_then(|m| m.cover.clone())
            .or_else(|| track.cover_url.clone());
        let cover = self.fetch_cover(cover_url.as_deref()).await;

        Ok(DownloadedAudio {
            bytes: body.bytes,
            cover,
        })
    }

    fn name(&self) -> &'static str {
        "mirror"
    }
}
