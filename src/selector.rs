//! Parser for track-number selector expressions like `"1, 4, 15-"` or `"*"`.
//!
//! A selector picks a subset of a collection's tracks by their 1-based
//! positions. Invalid or out-of-range tokens are logged and skipped; they
//! never abort parsing of the remaining tokens.

use log::warn;

/// A parsed selector token, normalized to 0-based indices.
///
/// Every emitted range lies within `[0, len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRange {
    Single(usize),
    /// Half-open interval `start..end`.
    Span { start: usize, end: usize },
}

/// Parses a raw selector string against a collection of length `len`.
///
/// Returns an empty vector when no valid token was found; the caller decides
/// whether that is fatal (non-interactive) or a re-prompt (interactive).
pub fn parse_selector(input: &str, len: usize) -> Vec<IndexRange> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut ranges = Vec::new();

    for token in compact.split(',') {
        if token.is_empty() {
            continue;
        }

        if token.chars().all(|c| c.is_ascii_digit()) {
            // 1-based single index
            match token.parse::<usize>() {
                Ok(num) if (1..=len).contains(&num) => ranges.push(IndexRange::Single(num - 1)),
                Ok(num) => {
                    warn!(
                        "Track number {} does not exist. Valid numbers are 1 - {}",
                        num, len
                    );
                }
                Err(_) => warn!("Invalid track number: '{}'", token),
            }
        } else if token == "*" {
            ranges.push(IndexRange::Span { start: 0, end: len });
        } else if let Some((start, end)) = token.split_once('-') {
            match parse_span(start, end, len) {
                Some(span) => ranges.push(span),
                None => warn!("Invalid selector token: '{}'", token),
            }
        } else {
            warn!("Invalid selector token: '{}'", token);
        }
    }

    ranges
}

/// `"-3"` means the first three tracks, `"8-"` means from the eighth to the
/// end, `"2-5"` means tracks two through five inclusive.
fn parse_span(start: &str, end: &str, len: usize) -> Option<IndexRange> {
    let start = if start.is_empty() {
        0
    } else {
        start.parse::<usize>().ok().filter(|&s| s >= 1)? - 1
    };
    let end = if end.is_empty() {
        len
    } else {
        end.parse::<usize>().ok()?
    };

    // Clamp to the collection; an inverted or fully out-of-range span is
    // still a valid (empty) interval rather than a parse failure.
    let start = start.min(len);
    let end = end.min(len).max(start);

    Some(IndexRange::Span { start, end })
}

/// Flattens parsed ranges into the final download order: original collection
/// order, with duplicates across overlapping ranges collapsed.
pub fn resolve(ranges: &[IndexRange], len: usize) -> Vec<usize> {
    let mut selected = vec![false; len];

    for range in ranges {
        match *range {
            IndexRange::Single(i) => {
                if i < len {
                    selected[i] = true;
                }
            }
            IndexRange::Span { start, end } => {
                for flag in selected.iter_mut().take(end.min(len)).skip(start) {
                    *flag = true;
                }
            }
        }
    }

    selected
        .iter()
        .enumerate()
        .filter_map(|(i, &on)| on.then_some(i))
        .collect()
}
