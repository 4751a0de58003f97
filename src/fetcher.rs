//! Resolves collection and track IDs into full metadata.
//!
//! The track list endpoint is paginated; pages are followed until the
//! backend stops returning a continuation cursor, so callers always see one
//! complete ordered sequence.

use crate::api::{ApiClient, CollectionMetadata, TrackListEntry};
use crate::errors::Result;
use crate::template;
use crate::track::{Collection, CollectionKind, Track};
use log::debug;

/// Fetches an album or playlist with its complete track list.
///
/// Returns `Ok(None)` when the collection does not exist or is private; that
/// is a normal negative result, distinct from transport errors.
pub async fn fetch_collection(
    api: &ApiClient,
    kind: CollectionKind,
    id: &str,
) -> Result<Option<Collection>> {
    let metadata = api.collection_metadata(kind.as_str(), id).await?;

    let mut page = api.track_list_page(kind.as_str(), id, None).await?;
    let mut entries = std::mem::take(&mut page.track_list);

    while let Some(offset) = page.next_offset {
        debug!("Fetching next {} page at offset {}", kind, offset);
        page = api.track_list_page(kind.as_str(), id, Some(offset)).await?;
        entries.append(&mut page.track_list);
    }

    Ok(build_collection(kind, id, &metadata, entries))
}

/// Assembles a collection from its metadata and accumulated track pages.
///
/// A failed metadata lookup or an empty track list both mean "not found".
fn build_collection(
    kind: CollectionKind,
    id: &str,
    metadata: &CollectionMetadata,
    entries: Vec<TrackListEntry>,
) -> Option<Collection> {
    if !metadata.success || entries.is_empty() {
        return None;
    }

    let title = metadata.title.clone().unwrap_or_default();
    let len = entries.len();

    let tracks = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            // Album track lists omit the album field; the collection title
            // is the album.
            let album = match kind {
                CollectionKind::Album => title.clone(),
                CollectionKind::Playlist => entry.album.unwrap_or_default(),
            };
            Track {
                url: Track::canonical_url(&entry.id),
                id: entry.id,
                title: entry.title,
                artist: entry.artists,
                album,
                track_num: template::pad_track_num(i + 1, len),
                cover_url: metadata.cover.clone(),
                release_date: None,
            }
        })
        .collect();

    Some(Collection {
        id: id.to_string(),
        kind,
        title,
        owner: metadata.artists.clone().unwrap_or_default(),
        tracks,
        cover_url: metadata.cover.clone(),
    })
}

/// Fetches a single track's metadata. `Ok(None)` when the track does not
/// exist.
pub async fn fetch_track(api: &ApiClient, id: &str) -> Result<Option<Track>> {
    let lookup = api.lookup_track(id).await?;

    let metadata = match (lookup.success, lookup.metadata) {
        (true, Some(metadata)) => metadata,
        _ => return Ok(None),
    };

    Ok(Some(Track {
        url: Track::canonical_url(&metadata.id),
        id: metadata.id,
        title: metadata.title,
        artist: metadata.artists,
        album: metadata.album.unwrap_or_default(),
        track_num: "0".to_string(),
        cover_url: metadata.cover,
        release_date: metadata.release_date,
    }))
}
