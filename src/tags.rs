//! Metadata tagging boundary.
//!
//! The orchestrator only guarantees the audio file exists and is fully
//! written before this is invoked; everything about the tag format lives
//! behind the `TagWriter` trait.

use crate::errors::{AppError, Result};
use crate::track::Track;
use chrono::{Datelike, NaiveDate};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag, TagExt};
use std::path::Path;

pub trait TagWriter: Send + Sync {
    fn write_tags(&self, path: &Path, track: &Track, cover: Option<&[u8]>) -> Result<()>;
}

/// Tag writer backed by lofty; handles ID3v2 for MP3 and the native tag
/// format of whatever container was downloaded.
pub struct LoftyTagWriter;

impl TagWriter for LoftyTagWriter {
    fn write_tags(&self, path: &Path, track: &Track, cover: Option<&[u8]>) -> Result<()> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| AppError::Tagging(format!("failed to open {}: {}", path.display(), e)))?
            .read()
            .map_err(|e| AppError::Tagging(format!("failed to probe {}: {}", path.display(), e)))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag_mut(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = match tagged_file.tag_mut(tag_type) {
            Some(tag) => tag,
            None => {
                return Err(AppError::Tagging(format!(
                    "no writable tag for {}",
                    path.display()
                )))
            }
        };

        tag.set_title(track.title.clone());
        tag.set_artist(track.artist.clone());
        if !track.album.is_empty() {
            tag.set_album(track.album.clone());
        }
        if let Ok(num) = track.track_num.parse::<u32>() {
            if num > 0 {
                tag.set_track(num);
            }
        }
        if let Some(year) = track.release_date.as_deref().and_then(release_year) {
            tag.set_year(year);
        }

        if let Some(bytes) = cover {
            let picture = Picture::new_unchecked(
                PictureType::CoverFront,
                Some(MimeType::Jpeg),
                None,
                bytes.to_vec(),
            );
            tag.push_picture(picture);
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| AppError::Tagging(format!("failed to save tags: {}", e)))?;

        Ok(())
    }
}

/// Release dates arrive as "2021-05-07" or just "2021".
fn release_year(date: &str) -> Option<u32> {
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return u32::try_from(parsed.year()).ok();
    }
    date.get(..4)?.parse::<u32>().ok()
}
