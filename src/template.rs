//! Filename templating with `{title}`, `{artist}`, `{album}` and
//! `{track_num}` placeholders.
//!
//! A template may contain `/` separators to sort downloads into
//! subdirectories, e.g. `"{album}/{track_num} - {title}"`. Directory
//! components may be pure literals; the final component must contain at
//! least one placeholder so that distinct tracks render distinct filenames.

use crate::errors::{AppError, Result};
use crate::track::Track;
use regex::Regex;

pub const DEFAULT_TEMPLATE: &str = "{title} - {artist}";

const RECOGNIZED: [&str; 4] = ["title", "artist", "album", "track_num"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

fn placeholder_regex() -> Regex {
    Regex::new(r"\{(\w+)\}").expect("placeholder regex")
}

/// Validates a full filename template, component by component.
pub fn validate(template: &str) -> Result<()> {
    let mut components = template.split('/').peekable();

    while let Some(component) = components.next() {
        let kind = if components.peek().is_some() {
            PathKind::Directory
        } else {
            PathKind::File
        };
        validate_component(component, kind)?;
    }

    Ok(())
}

fn validate_component(component: &str, kind: PathKind) -> Result<()> {
    let re = placeholder_regex();
    let mut found_any = false;

    for captures in re.captures_iter(component) {
        let name = &captures[1];
        if !RECOGNIZED.contains(&name) {
            return Err(AppError::InvalidTemplate(format!(
                "unknown placeholder '{{{}}}'; recognized placeholders are {}",
                name,
                RECOGNIZED
                    .iter()
                    .map(|v| format!("{{{}}}", v))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        found_any = true;
    }

    // Directory components may be literal; a filename without any
    // placeholder would render the same name for every track.
    if kind == PathKind::File && !found_any {
        return Err(AppError::InvalidTemplate(format!(
            "'{}' contains no recognized placeholder",
            component
        )));
    }

    Ok(())
}

/// Renders a template for a track into a relative path (no extension).
///
/// Placeholder values are sanitized before substitution so a title
/// containing `/` cannot introduce unintended subdirectories. Multiple
/// occurrences of the same placeholder all receive the same value.
pub fn render(template: &str, track: &Track) -> String {
    let title = sanitize(&track.title);
    let artist = sanitize(&track.artist);
    let album = sanitize(&track.album);

    template
        .split('/')
        .map(|component| {
            component
                .replace("{title}", &title)
                .replace("{artist}", &artist)
                .replace("{album}", &album)
                .replace("{track_num}", &track.track_num)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Replaces filesystem-hostile characters with underscores.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Zero-pads a 1-based track position to the digit width of the collection
/// size, so files sort correctly: 7 of 120 becomes "007".
pub fn pad_track_num(position: usize, collection_len: usize) -> String {
    let width = collection_len.max(1).to_string().len();
    format!("{:0width$}", position, width = width)
}
