//! Episode matcher.
//!
//! Matches one title segment against an ordered canonical episode list:
//! an exact (case/whitespace-insensitive) pass first, then a fuzzy pass
//! using normalized Levenshtein similarity.

use crate::models::episode::{CanonicalEpisode, EpisodeTitle};
use crate::models::plan::{MatchResult, ACCEPTANCE_SCORE, EXACT_SCORE};

/// Default minimum similarity ratio for a fuzzy match.
pub const DEFAULT_ACCEPTANCE_RATIO: f64 = ACCEPTANCE_SCORE / 100.0;

/// A match borrowed from the canonical list.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeMatch<'a, E> {
    /// Matched title.
    pub title: Option<String>,
    /// Score in `[0, 100]`.
    pub score: f64,
    /// Matched episode.
    pub episode: Option<&'a E>,
}

impl<E> EpisodeMatch<'_, E> {
    fn none() -> Self {
        Self {
            title: None,
            score: 0.0,
            episode: None,
        }
    }

    /// Whether an episode was accepted.
    pub fn is_match(&self) -> bool {
        self.episode.is_some()
    }
}

impl EpisodeMatch<'_, CanonicalEpisode> {
    /// Convert into an owned result for `segment`.
    pub fn into_result(self, segment: &str) -> MatchResult {
        MatchResult {
            segment: segment.to_string(),
            matched_title: self.title,
            score: self.score,
            episode: self.episode.cloned(),
        }
    }
}

/// Similarity ratio in `[0, 1]` between two titles after trimming and
/// lowercasing.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize(a), &normalize(b))
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Episode matcher with a configurable acceptance ratio.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeMatcher {
    acceptance_ratio: f64,
}

impl Default for EpisodeMatcher {
    fn default() -> Self {
        Self {
            acceptance_ratio: DEFAULT_ACCEPTANCE_RATIO,
        }
    }
}

impl EpisodeMatcher {
    /// Create a matcher with the default 0.6 acceptance ratio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher with a custom acceptance ratio, clamped to `[0, 1]`.
    pub fn with_ratio(acceptance_ratio: f64) -> Self {
        Self {
            acceptance_ratio: acceptance_ratio.clamp(0.0, 1.0),
        }
    }

    /// Match `segment` against `episodes`. Never fails; a weak best candidate
    /// yields a no-match.
    pub fn find_best<'a, E: EpisodeTitle>(
        &self,
        segment: &str,
        episodes: &'a [E],
    ) -> EpisodeMatch<'a, E> {
        let wanted = normalize(segment);
        if wanted.is_empty() {
            return EpisodeMatch::none();
        }

        for ep in episodes {
            if let Some(title) = ep.title() {
                if normalize(title) == wanted {
                    return EpisodeMatch {
                        title: Some(title.to_string()),
                        score: EXACT_SCORE,
                        episode: Some(ep),
                    };
                }
            }
        }

        let mut best: Option<(f64, &'a E, &'a str)> = None;
        for ep in episodes {
            let Some(title) = ep.title() else {
                continue;
            };
            let ratio = strsim::normalized_levenshtein(&wanted, &normalize(title));
            // Strictly greater keeps the first candidate on ties.
            if best.map_or(true, |(best_ratio, _, _)| ratio > best_ratio) {
                best = Some((ratio, ep, title));
            }
        }

        match best {
            Some((ratio, ep, title)) if ratio >= self.acceptance_ratio => {
                tracing::debug!("Fuzzy match {:?} -> {:?} ({:.3})", segment, title, ratio);
                EpisodeMatch {
                    title: Some(title.to_string()),
                    score: ratio * 100.0,
                    episode: Some(ep),
                }
            }
            Some((ratio, _, title)) => {
                tracing::debug!(
                    "No match for {:?}; best was {:?} ({:.3})",
                    segment,
                    title,
                    ratio
                );
                EpisodeMatch::none()
            }
            None => EpisodeMatch::none(),
        }
    }

    /// Match against canonical episodes and return an owned result.
    pub fn match_episode(&self, segment: &str, episodes: &[CanonicalEpisode]) -> MatchResult {
        self.find_best(segment, episodes).into_result(segment)
    }

    /// The `limit` most similar titles, best first, ties in list order.
    pub fn top_candidates<E: EpisodeTitle>(
        &self,
        segment: &str,
        episodes: &[E],
        limit: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(usize, f64, &str)> = episodes
            .iter()
            .enumerate()
            .filter_map(|(idx, ep)| ep.title().map(|t| (idx, similarity(segment, t), t)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, _, title)| title.to_string())
            .collect()
    }
}

/// Match a segment with the default acceptance ratio (convenience function).
pub fn match_episode(segment: &str, episodes: &[CanonicalEpisode]) -> MatchResult {
    EpisodeMatcher::new().match_episode(segment, episodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn episodes() -> Vec<CanonicalEpisode> {
        vec![
            CanonicalEpisode::new(1, 1, "Pups Make a Splash"),
            CanonicalEpisode::new(1, 2, "Pups Save a Train"),
            CanonicalEpisode::new(1, 3, "Pup Pup Boogie"),
        ]
    }

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        let result = match_episode("  pups SAVE a train ", &episodes());
        assert_eq!(result.score, 100.0);
        assert_eq!(result.matched_title.as_deref(), Some("Pups Save a Train"));
        assert_eq!(result.episode.unwrap().episode, 2);
    }

    #[test]
    fn test_fuzzy_match_below_exact() {
        let result = match_episode("pups save train", &episodes());
        assert!(result.score >= 60.0 && result.score < 100.0, "score {}", result.score);
        assert_eq!(result.matched_title.as_deref(), Some("Pups Save a Train"));
        assert_eq!(result.episode.unwrap().episode, 2);
    }

    #[test]
    fn test_weak_match_is_no_match() {
        let result = match_episode("Completely Unrelated Words", &episodes());
        assert!(result.matched_title.is_none());
        assert!(result.episode.is_none());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_empty_list_is_no_match() {
        let result = match_episode("Pups Save a Train", &[]);
        assert!(!result.is_match());
    }

    #[test]
    fn test_fuzzy_ties_keep_list_order() {
        let eps = vec![
            CanonicalEpisode::new(1, 1, "Abcd"),
            CanonicalEpisode::new(1, 2, "Abce"),
        ];
        let result = match_episode("Abcx", &eps);
        assert_eq!(result.episode.unwrap().episode, 1);
    }

    #[test]
    fn test_score_tracks_similarity() {
        let eps = vec![CanonicalEpisode::new(1, 1, "Pups Save a Train")];
        let close = match_episode("Pups Save a Trai", &eps).score;
        let further = match_episode("Pups Save Trn", &eps).score;
        assert!(close > further);
        assert!(close < 100.0);
    }

    #[test]
    fn test_key_value_episodes() {
        let records: Vec<Map<String, Value>> = vec![
            json!({"season": 1, "episode": 1, "title": "Foo"}).as_object().cloned().unwrap(),
            json!({"season": 1, "episode": 2}).as_object().cloned().unwrap(),
            json!({"season": 1, "episode": 3, "title": "Bar Baz"}).as_object().cloned().unwrap(),
        ];
        let found = EpisodeMatcher::new().find_best("bar baz", &records);
        assert_eq!(found.score, 100.0);
        assert_eq!(found.episode.unwrap()["episode"], 3);
    }

    #[test]
    fn test_custom_ratio() {
        let strict = EpisodeMatcher::with_ratio(0.95);
        assert!(!strict.match_episode("pups save train", &episodes()).is_match());
    }

    #[test]
    fn test_top_candidates() {
        let top = EpisodeMatcher::new().top_candidates("pups save", &episodes(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], "Pups Save a Train");
    }
}
