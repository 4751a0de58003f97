//! HTTP client for the mirror download API.
//!
//! The mirror only answers requests that look like they came from its own
//! web frontend, so every call carries browser-shaped headers.

use crate::errors::{AppError, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const API_BASE: &str = "https://api.spotifydown.com";
const REFERER: &str = "https://spotifydown.com/";
const ORIGIN: &str = "https://spotifydown.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";

/// `GET /download/{id}` response: track metadata plus a short-lived CDN link.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackLookup {
    pub success: bool,
    pub link: Option<String>,
    pub metadata: Option<TrackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackMetadata {
    pub id: String,
    pub title: String,
    /// Multiple artists arrive pre-joined ("A, B").
    pub artists: String,
    pub album: Option<String>,
    pub cover: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
}

/// `GET /metadata/{kind}/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionMetadata {
    pub success: bool,
    pub title: Option<String>,
    pub artists: Option<String>,
    pub cover: Option<String>,
}

/// One page of `GET /trackList/{kind}/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackListPage {
    #[serde(default, rename = "trackList")]
    pub track_list: Vec<TrackListEntry>,
    #[serde(rename = "nextOffset")]
    pub next_offset: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackListEntry {
    pub id: String,
    pub title: String,
    pub artists: String,
    pub album: Option<String>,
}

/// A fetched response body with enough context to judge it.
#[derive(Debug)]
pub struct FetchedBody {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
        headers.insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .default_headers(headers)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", API_BASE, endpoint))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Backend(format!(
                "mirror API returned {} for {}",
                response.status(),
                endpoint
            )));
        }

        Ok(response.json::<T>().await?)
    }

    /// Looks up a track's metadata and a fresh download link.
    pub async fn lookup_track(&self, track_id: &str) -> Result<TrackLookup> {
        self.get_json(&format!("/download/{}", track_id)).await
    }

    pub async fn collection_metadata(
        &self,
        kind: &str,
        id: &str,
    ) -> Result<CollectionMetadata> {
        self.get_json(&format!("/metadata/{}/{}", kind, id)).await
    }

    pub async fn track_list_page(
        &self,
        kind: &str,
        id: &str,
        offset: Option<u64>,
    ) -> Result<TrackListPage> {
        let endpoint = match offset {
            Some(offset) => format!("/trackList/{}/{}?offset={}", kind, id, offset),
            None => format!("/trackList/{}/{}", kind, id),
        };
        self.get_json(&endpoint).await
    }

    /// Fetches an arbitrary URL (CDN audio link, cover art) with the same
    /// browser headers. Status judgement is left to the caller.
    pub async fn fetch_body(&self, url: &str) -> Result<FetchedBody> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedBody {
            status,
            content_type,
            bytes,
        })
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}
