pub mod mirror;
pub mod relay;

pub use mirror::MirrorDownloader;
pub use relay::RelayDownloader;

use crate::api::ApiClient;
use crate::errors::Result;
use crate::track::Track;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One unit of work for the orchestrator: a track plus where it goes.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub track: Track,
    /// Rendered relative path under `output_dir`, without extension. May
    /// contain `/` separators from a templated subdirectory.
    pub filename: String,
    pub output_dir: PathBuf,
}

impl DownloadTask {
    pub fn target_path(&self, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.filename, extension))
    }
}

/// Result of a backend fetch: the audio payload plus cover-art bytes when
/// the backend could get them (cover failures are never fatal).
#[derive(Debug)]
pub struct DownloadedAudio {
    pub bytes: Vec<u8>,
    pub cover: Option<Vec<u8>>,
}

/// A remote content backend. Variants differ in how they resolve a fresh
/// fetch link, what rate-limit delays they observe, and how they detect
/// soft failures; all of that stays behind this interface.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch_audio(&self, track: &Track) -> Result<DownloadedAudio>;
    fn name(&self) -> &'static str;
}

/// The closed set of available backends, selected once at configuration
/// time, never autodetected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Primary mirror API (spotifydown-style).
    Mirror,
    /// Secondary relay service with a published rate limit.
    Relay,
}

pub fn make_downloader(backend: Backend) -> Box<dyn Downloader> {
    match backend {
        Backend::Mirror => Box::new(MirrorDownloader::new(ApiClient::new())),
        Backend::Relay => Box::new(RelayDownloader::new()),
    }
}
