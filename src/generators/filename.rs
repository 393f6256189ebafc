//! Target path generator.
//!
//! Plex:     `<root>/<Show>/Season NN/<Show> - S01E02 - <Title>.<ext>`
//! Jellyfin: `<root>/<Show> (<Year>)/Season NN/<Show> S01E02 <Title>.<ext>`
//!
//! Files holding several consecutive episodes get a range code
//! (`S01E01-E02`), other multi-episode files list every number
//! (`S01E01E05`). Titles are joined with ` & `.

use crate::models::config::Platform;
use crate::models::episode::CanonicalEpisode;
use std::path::{Path, PathBuf};

/// Everything needed to name one media file.
#[derive(Debug, Clone)]
pub struct EpisodeTarget<'a> {
    pub show: &'a str,
    pub year: Option<u16>,
    pub season: u16,
    /// Matched episodes, in any order. Must not be empty.
    pub episodes: &'a [CanonicalEpisode],
    pub extension: Option<&'a str>,
}

/// Episode code for one or more episode numbers: `S01E02`, `S01E01-E03`
/// for a consecutive run, or `S01E01E05` when numbers are missing between.
pub fn episode_code(season: u16, episodes: &[u16]) -> String {
    let mut numbers = episodes.to_vec();
    numbers.sort_unstable();
    numbers.dedup();

    match numbers.as_slice() {
        [] => format!("S{:02}E00", season),
        [only] => format!("S{:02}E{:02}", season, only),
        [first, .., last] if usize::from(last - first) + 1 == numbers.len() => {
            format!("S{:02}E{:02}-E{:02}", season, first, last)
        }
        _ => {
            let listed: String = numbers.iter().map(|n| format!("E{:02}", n)).collect();
            format!("S{:02}{}", season, listed)
        }
    }
}

/// Combined title of the matched episodes, in episode order.
fn joined_title(episodes: &[CanonicalEpisode]) -> String {
    let mut sorted: Vec<&CanonicalEpisode> = episodes.iter().collect();
    sorted.sort_by_key(|ep| ep.episode);
    sorted.dedup_by_key(|ep| ep.episode);
    sorted
        .iter()
        .map(|ep| ep.title.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" & ")
}

/// Generate the episode filename (no directories).
pub fn generate_episode_filename(platform: Platform, target: &EpisodeTarget) -> String {
    let numbers: Vec<u16> = target.episodes.iter().map(|ep| ep.episode).collect();
    let code = episode_code(target.season, &numbers);
    let show = sanitize_filename(target.show);
    let title = sanitize_filename(&joined_title(target.episodes));

    let stem = match (platform, title.is_empty()) {
        (Platform::Plex, false) => format!("{} - {} - {}", show, code, title),
        (Platform::Plex, true) => format!("{} - {}", show, code),
        (Platform::Jellyfin, false) => format!("{} {} {}", show, code, title),
        (Platform::Jellyfin, true) => format!("{} {}", show, code),
    };

    match target.extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem,
    }
}

/// Generate the show folder name.
pub fn generate_show_folder(platform: Platform, show: &str, year: Option<u16>) -> String {
    let show = sanitize_filename(show);
    match (platform, year) {
        (Platform::Jellyfin, Some(year)) => format!("{} ({})", show, year),
        _ => show,
    }
}

/// Full target path under `root`.
pub fn episode_target_path(root: &Path, platform: Platform, target: &EpisodeTarget) -> PathBuf {
    root.join(generate_show_folder(platform, target.show, target.year))
        .join(format!("Season {:02}", target.season))
        .join(generate_episode_filename(platform, target))
}

/// Sanitize a string for use in filenames.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}
