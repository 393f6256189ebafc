//! Filename parser module.
//!
//! Extracts from a raw episode filename:
//! - Show name (year stripped)
//! - Season number
//! - Episode number, or a contiguous span of episodes
//! - Release year
//! - Whether the title looks like an anthology of several episodes

use crate::models::config::RuleConfig;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

static SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)S(\d{1,2})E(\d{1,3})\s*[-–]\s*E(\d{1,3})\b").expect("valid span regex")
});

static SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S(\d{1,2})E(\d{1,3})").expect("valid episode regex"));

static ALT_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})x(\d{2,3})(?:\s*[-–]\s*\d{1,2}x|[-–])(\d{2,3})\b")
        .expect("valid alternate span regex")
});

static ALT_SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})x(\d{2,3})\b").expect("valid alternate regex"));

static PAREN_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[(\[]((?:19|20)\d{2})[)\]]").expect("valid year regex"));

static TRAILING_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s._-]((?:19|20)\d{2})$").expect("valid year regex"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Parsed filename information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFilenameInfo {
    /// Show name with year and episode markers removed. May be empty.
    pub show: String,
    /// Season number.
    pub season: u16,
    /// Episode numbers, strictly increasing and contiguous.
    pub episodes: Vec<u16>,
    /// Release year.
    pub year: Option<u16>,
    /// Whether the title remainder hints at several episodes.
    pub anthology: bool,
    /// Text after the episode marker, extension removed.
    pub title: Option<String>,
    /// File extension in lowercase, without the dot.
    pub extension: Option<String>,
}

impl ParsedFilenameInfo {
    /// First episode number.
    pub fn first_episode(&self) -> u16 {
        self.episodes.first().copied().unwrap_or_default()
    }

    /// Whether this file bundles more than one episode.
    pub fn is_span(&self) -> bool {
        self.episodes.len() > 1
    }
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Accept only `SxxEyy` markers.
    pub strict: bool,
    /// Words that hint at an anthology title, compared case-insensitively.
    pub anthology_keywords: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::from(&RuleConfig::default())
    }
}

impl From<&RuleConfig> for ParserConfig {
    fn from(rules: &RuleConfig) -> Self {
        Self {
            strict: rules.strict_structure,
            anthology_keywords: rules
                .anthology_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }
}

/// Episode marker found in a filename.
struct Marker {
    season: u16,
    episodes: Vec<u16>,
    span: Range<usize>,
}

/// Filename parser.
#[derive(Debug, Clone, Default)]
pub struct FilenameParser {
    config: ParserConfig,
}

impl FilenameParser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a single filename.
    pub fn parse(&self, filename: &str) -> Result<ParsedFilenameInfo> {
        let (stem, extension) = split_extension(filename);

        let marker = self
            .find_marker(stem)
            .ok_or_else(|| Error::Parse(filename.to_string()))?;

        let show_part = &stem[..marker.span.start];
        let remainder = &stem[marker.span.end..];

        let (show_part, remainder, year) = extract_year(show_part, remainder);
        let show = clean_words(&show_part);
        let title = clean_words(remainder.trim_start_matches(|c: char| " -_.".contains(c)));
        let title = (!title.is_empty()).then_some(title);

        let anthology = title
            .as_deref()
            .map(|t| self.has_anthology_hint(t))
            .unwrap_or(false);

        tracing::debug!(
            "Parsed {:?}: show={:?} season={} episodes={:?} year={:?} anthology={}",
            filename,
            show,
            marker.season,
            marker.episodes,
            year,
            anthology
        );

        Ok(ParsedFilenameInfo {
            show,
            season: marker.season,
            episodes: marker.episodes,
            year,
            anthology,
            title,
            extension,
        })
    }

    /// Locate the season/episode marker, preferring spans over singles.
    fn find_marker(&self, stem: &str) -> Option<Marker> {
        if let Some(marker) = span_marker(&SPAN_RE, stem) {
            return Some(marker);
        }
        if let Some(marker) = single_marker(&SINGLE_RE, stem) {
            return Some(marker);
        }
        if self.config.strict {
            return None;
        }
        span_marker(&ALT_SPAN_RE, stem).or_else(|| single_marker(&ALT_SINGLE_RE, stem))
    }

    /// Check the title remainder for anthology hint words.
    fn has_anthology_hint(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| c.is_whitespace() || "._-,".contains(c))
            .filter(|w| !w.is_empty())
            .collect();

        self.config.anthology_keywords.iter().any(|keyword| {
            if keyword.chars().all(char::is_alphanumeric) {
                words.iter().any(|w| *w == keyword.as_str())
            } else {
                lower.contains(keyword.as_str())
            }
        })
    }
}

fn span_marker(re: &Regex, stem: &str) -> Option<Marker> {
    let caps = re.captures(stem)?;
    let whole = caps.get(0)?;
    let season = caps.get(1)?.as_str().parse().ok()?;
    let start: u16 = caps.get(2)?.as_str().parse().ok()?;
    let end: u16 = caps.get(3)?.as_str().parse().ok()?;

    // A reversed or degenerate range is not a span; let the single pattern take it.
    if end <= start {
        return None;
    }

    Some(Marker {
        season,
        episodes: (start..=end).collect(),
        span: whole.range(),
    })
}

fn single_marker(re: &Regex, stem: &str) -> Option<Marker> {
    let caps = re.captures(stem)?;
    let whole = caps.get(0)?;
    Some(Marker {
        season: caps.get(1)?.as_str().parse().ok()?,
        episodes: vec![caps.get(2)?.as_str().parse().ok()?],
        span: whole.range(),
    })
}

/// Split a filename into stem and lowercase extension.
fn split_extension(filename: &str) -> (&str, Option<String>) {
    match filename.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && !ext.chars().all(|c| c.is_ascii_digit()) =>
        {
            (stem, Some(ext.to_lowercase()))
        }
        _ => (filename, None),
    }
}

/// Pull a year out of the show part or the remainder.
///
/// Order: parenthetical year in the show part, trailing year in the show
/// part, parenthetical year in the remainder, trailing year in the remainder.
fn extract_year(show_part: &str, remainder: &str) -> (String, String, Option<u16>) {
    if let Some((cleaned, year)) = take_year(&PAREN_YEAR_RE, show_part) {
        return (cleaned, remainder.to_string(), Some(year));
    }
    let trimmed_show = show_part.trim_end_matches(|c: char| " -_.".contains(c));
    if let Some((cleaned, year)) = take_year(&TRAILING_YEAR_RE, trimmed_show) {
        return (cleaned, remainder.to_string(), Some(year));
    }
    if let Some((cleaned, year)) = take_year(&PAREN_YEAR_RE, remainder) {
        return (show_part.to_string(), cleaned, Some(year));
    }
    let trimmed_rest = remainder.trim_end();
    if let Some((cleaned, year)) = take_year(&TRAILING_YEAR_RE, trimmed_rest) {
        return (show_part.to_string(), cleaned, Some(year));
    }
    (show_part.to_string(), remainder.to_string(), None)
}

fn take_year(re: &Regex, text: &str) -> Option<(String, u16)> {
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    // Keep the name's own separator style so dotted names still read as dotted.
    let separator = if text.trim().contains(' ') { ' ' } else { '.' };
    let mut cleaned = String::with_capacity(text.len());
    cleaned.push_str(&text[..whole.start()]);
    cleaned.push(separator);
    cleaned.push_str(&text[whole.end()..]);
    Some((cleaned, year))
}

/// Turn dotted/underscored release names into words and trim separators.
fn clean_words(text: &str) -> String {
    let spaced = if text.trim().contains(' ') {
        text.replace('_', " ")
    } else {
        text.replace(['.', '_'], " ")
    };
    let collapsed = WHITESPACE_RE.replace_all(&spaced, " ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || "-_.:".contains(c))
        .to_string()
}

/// Parse a filename with default rules (convenience function).
pub fn parse_filename(filename: &str) -> Result<ParsedFilenameInfo> {
    FilenameParser::new().parse(filename)
}
