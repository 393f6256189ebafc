//! Anthology segmenter.
//!
//! Splits a combined title such as `"Pups Save a Train & Pups Save a Hedgehog"`
//! into candidate episode-title segments, and provides the token-set overlap
//! heuristic used to validate splits and narrow fuzzy matching.

use crate::models::episode::EpisodeTitle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static DELIMITER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:&|/|\band\b|\bS\d{1,2}E\d{1,3}\b|\bE\d{1,3}\b)\s*")
        .expect("valid delimiter regex")
});

/// Remove a leading `"<show> - "` or `"<show>: "` preamble from a title.
///
/// Returns the title unchanged when no recognized preamble is present.
pub fn strip_preamble(title: &str, show: &str) -> String {
    let show = show.trim();
    if show.is_empty() {
        return title.to_string();
    }

    let trimmed = title.trim_start();
    let Some(head) = trimmed.get(..show.len()) else {
        return title.to_string();
    };
    if !head.eq_ignore_ascii_case(show) {
        return title.to_string();
    }

    let rest = &trimmed[show.len()..];
    for delimiter in [" - ", ": ", " – "] {
        if let Some(stripped) = rest.strip_prefix(delimiter) {
            return stripped.trim().to_string();
        }
    }
    title.to_string()
}

/// Split a title on conjunctions (`&`, `and`, `/`) and on embedded episode
/// markers. Empty segments are dropped and order is kept.
pub fn split_segments(title: &str) -> Vec<String> {
    DELIMITER_RE
        .split(title)
        .map(|s| s.trim_matches(|c: char| c.is_whitespace() || "-_.,".contains(c)))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase, punctuation-free word set of a string.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Token-set overlap between two strings.
///
/// When both sides have at most two tokens a single shared token is enough.
/// Otherwise at least two shared tokens are required. Symmetric by
/// construction.
pub fn token_overlap(a: &str, b: &str) -> bool {
    let left = tokenize(a);
    let right = tokenize(b);
    let shared = left.intersection(&right).count();

    if left.len() <= 2 && right.len() <= 2 {
        shared >= 1
    } else {
        shared >= 2
    }
}

/// Candidates from `episodes` whose title overlaps `segment`, in list order.
pub fn overlapping<'a, E: EpisodeTitle>(segment: &str, episodes: &'a [E]) -> Vec<&'a E> {
    episodes
        .iter()
        .filter(|ep| ep.title().is_some_and(|t| token_overlap(segment, t)))
        .collect()
}

/// Whether a split is plausible against a canonical list: every segment must
/// overlap at least one canonical title. An empty list cannot refute a split.
pub fn validate_split<E: EpisodeTitle>(segments: &[String], episodes: &[E]) -> bool {
    if episodes.is_empty() {
        return true;
    }
    segments
        .iter()
        .all(|segment| !overlapping(segment, episodes).is_empty())
}

/// Strip the preamble and split into segments, keeping the whole title as a
/// single segment when the split is implausible.
pub fn segment_title<E: EpisodeTitle>(title: &str, show: &str, episodes: &[E]) -> Vec<String> {
    let stripped = strip_preamble(title, show);
    let segments = split_segments(&stripped);

    if segments.len() >= 2 && validate_split(&segments, episodes) {
        tracing::debug!("Split {:?} into {:?}", stripped, segments);
        return segments;
    }

    let whole = stripped.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}
