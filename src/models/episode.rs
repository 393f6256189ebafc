//! Canonical episode data model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authoritative season/episode/title record from a metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEpisode {
    /// Season number.
    pub season: u16,
    /// Episode number within the season.
    pub episode: u16,
    /// Episode title.
    pub title: String,
    /// Absolute episode number across all seasons, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_episode: Option<u32>,
}

impl CanonicalEpisode {
    /// Create an episode without an absolute number.
    pub fn new(season: u16, episode: u16, title: impl Into<String>) -> Self {
        Self {
            season,
            episode,
            title: title.into(),
            absolute_episode: None,
        }
    }

    /// Build an episode from a key-value record.
    ///
    /// Accepts `season`/`season_number`, `episode`/`episode_number`,
    /// `title`/`name` and `absolute_episode`/`absolute_number`. Numbers may be JSON numbers or
    /// zero-padded strings. Returns `None` when season or episode is missing,
    /// zero or negative.
    pub fn from_record(record: &Map<String, Value>) -> Option<Self> {
        let season = lookup_number(record, &["season", "season_number"])?;
        let episode = lookup_number(record, &["episode", "episode_number"])?;
        if season == 0 || episode == 0 {
            return None;
        }

        let title = ["title", "name"]
            .iter()
            .find_map(|key| record.get(*key).and_then(Value::as_str))
            .unwrap_or("Unknown Title")
            .trim()
            .to_string();

        let absolute_episode = lookup_number(record, &["absolute_episode", "absolute_number"])
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok());

        Some(Self {
            season: u16::try_from(season).ok()?,
            episode: u16::try_from(episode).ok()?,
            title,
            absolute_episode,
        })
    }
}

/// Something that exposes an episode title, regardless of how the episode
/// is represented.
pub trait EpisodeTitle {
    /// The episode title, if the record carries one.
    fn title(&self) -> Option<&str>;
}

impl EpisodeTitle for CanonicalEpisode {
    fn title(&self) -> Option<&str> {
        Some(&self.title)
    }
}

impl EpisodeTitle for Map<String, Value> {
    fn title(&self) -> Option<&str> {
        ["title", "name"]
            .iter()
            .find_map(|key| self.get(*key).and_then(Value::as_str))
    }
}

impl<T: EpisodeTitle + ?Sized> EpisodeTitle for &T {
    fn title(&self) -> Option<&str> {
        (**self).title()
    }
}

/// Normalize a list of key-value records into canonical episodes, dropping
/// rows with invalid numbering.
pub fn normalize_episode_records(records: &[Map<String, Value>]) -> Vec<CanonicalEpisode> {
    records
        .iter()
        .filter_map(|record| {
            let episode = CanonicalEpisode::from_record(record);
            if episode.is_none() {
                tracing::debug!("Dropping episode record with invalid numbering: {:?}", record);
            }
            episode
        })
        .collect()
}

fn lookup_number(record: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(coerce_number)
}

fn coerce_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_record_coerces_padded_strings() {
        let ep = CanonicalEpisode::from_record(&record(json!({
            "season_number": "01",
            "episode": "07",
            "title": "Pups Save a Train",
            "absolute_number": 33
        })))
        .unwrap();

        assert_eq!(ep.season, 1);
        assert_eq!(ep.episode, 7);
        assert_eq!(ep.title, "Pups Save a Train");
        assert_eq!(ep.absolute_episode, Some(33));
    }

    #[test]
    fn test_from_record_drops_invalid_numbers() {
        assert!(CanonicalEpisode::from_record(&record(json!({"season": 0, "episode": 1}))).is_none());
        assert!(CanonicalEpisode::from_record(&record(json!({"season": 1, "episode": -2}))).is_none());
        assert!(CanonicalEpisode::from_record(&record(json!({"season": "x", "episode": 2}))).is_none());
        assert!(CanonicalEpisode::from_record(&record(json!({"title": "No numbers"}))).is_none());
    }

    #[test]
    fn test_from_record_provider_shape() {
        let ep = CanonicalEpisode::from_record(&record(json!({
            "season_number": 2,
            "episode_number": 4,
            "name": " Pups Save a Walrus ",
            "absolute_number": 5_000_000_000u64
        })))
        .unwrap();

        assert_eq!(ep.title, "Pups Save a Walrus");
        assert_eq!(ep.absolute_episode, None);
    }

    #[test]
    fn test_title_accessor_is_uniform() {
        let canonical = CanonicalEpisode::new(1, 1, "Foo");
        let map = record(json!({"season": 1, "episode": 1, "title": "Foo"}));

        assert_eq!(EpisodeTitle::title(&canonical), Some("Foo"));
        assert_eq!(EpisodeTitle::title(&map), Some("Foo"));
        assert_eq!(EpisodeTitle::title(&record(json!({"season": 1}))), None);
    }

    #[test]
    fn test_normalize_episode_records() {
        let records = vec![
            record(json!({"season": 1, "episode": 1, "title": "A"})),
            record(json!({"season": 1, "episode": 0, "title": "Special"})),
            record(json!({"season": 1, "episode": 2})),
        ];
        let episodes = normalize_episode_records(&records);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[1].title, "Unknown Title");
    }
}
