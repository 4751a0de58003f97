use serde::{Deserialize, Serialize};

/// A single downloadable track.
///
/// Two tracks with the same canonical URL are the same track, even when one
/// of them was refreshed from a second metadata lookup and carries slightly
/// different display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Display artist; multiple artists arrive pre-joined from the API.
    pub artist: String,
    pub album: String,
    /// 1-based position in the collection, zero-padded to the digit width of
    /// the collection size. "0" for tracks downloaded outside a collection.
    pub track_num: String,
    pub cover_url: Option<String>,
    pub release_date: Option<String>,
    /// Canonical source URL; defines track identity.
    pub url: String,
}

impl Track {
    pub fn canonical_url(id: &str) -> String {
        format!("https://open.spotify.com/track/{}", id)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Track {}

impl std::hash::Hash for Track {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Album,
    Playlist,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Album => "album",
            CollectionKind::Playlist => "playlist",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An album or playlist with its full, ordered track list.
///
/// Track order here is authoritative: it is the numbering basis for
/// `{track_num}` substitution and for selector indices.
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: String,
    pub kind: CollectionKind,
    pub title: String,
    pub owner: String,
    pub tracks: Vec<Track>,
    pub cover_url: Option<String>,
}
