//! Rename plan data model.

use super::episode::CanonicalEpisode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Score above which a fuzzy match is accepted (ratio 0.6).
pub const ACCEPTANCE_SCORE: f64 = 60.0;

/// Score given to exact matches.
pub const EXACT_SCORE: f64 = 100.0;

/// Outcome of matching one title segment against a canonical list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The segment that was matched.
    pub segment: String,
    /// Matched canonical title, if any.
    pub matched_title: Option<String>,
    /// Confidence score in `[0, 100]`.
    pub score: f64,
    /// Matched canonical episode. Set only for accepted matches.
    pub episode: Option<CanonicalEpisode>,
}

impl MatchResult {
    /// A confident identity match.
    pub fn exact(segment: impl Into<String>, episode: CanonicalEpisode) -> Self {
        Self {
            segment: segment.into(),
            matched_title: Some(episode.title.clone()),
            score: EXACT_SCORE,
            episode: Some(episode),
        }
    }

    /// The no-match sentinel.
    pub fn no_match(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            matched_title: None,
            score: 0.0,
            episode: None,
        }
    }

    /// Whether this result carries an accepted episode.
    pub fn is_match(&self) -> bool {
        self.episode.is_some()
    }
}

/// Status of a rename plan item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Conflict,
    Duplicate,
    Failed,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Pending => write!(f, "pending"),
            PlanStatus::Conflict => write!(f, "conflict"),
            PlanStatus::Duplicate => write!(f, "duplicate"),
            PlanStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single rename in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePlanItem {
    /// Current location of the media file.
    pub source: PathBuf,
    /// Computed destination. Equal to `source` for failed items.
    pub target: PathBuf,
    /// Item status.
    pub status: PlanStatus,
    /// SHA-256 of the content, when it was computed.
    pub checksum: Option<String>,
    /// Why the item is not pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ordered rename plan, sorted by target path.
///
/// Serializes as a bare JSON array of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenamePlan {
    pub items: Vec<RenamePlanItem>,
}

impl RenamePlan {
    /// Number of items with the given status.
    pub fn count(&self, status: PlanStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Items that still need to be executed.
    pub fn pending(&self) -> impl Iterator<Item = &RenamePlanItem> {
        self.items.iter().filter(|i| i.status == PlanStatus::Pending)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// A file that could not be parsed and was left out of the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Source path.
    pub source: PathBuf,
    /// Reason it was skipped.
    pub reason: String,
}

/// Result of planning a batch: the plan plus the files that never reached it.
#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    pub plan: RenamePlan,
    pub skipped: Vec<SkippedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&PlanStatus::Duplicate).unwrap();
        assert_eq!(json, "\"duplicate\"");
    }

    #[test]
    fn test_plan_serializes_as_array() {
        let plan = RenamePlan {
            items: vec![RenamePlanItem {
                source: PathBuf::from("/in/a.mkv"),
                target: PathBuf::from("/out/A.mkv"),
                status: PlanStatus::Pending,
                checksum: None,
                reason: None,
            }],
        };
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(
            json,
            r#"[{"source":"/in/a.mkv","target":"/out/A.mkv","status":"pending","checksum":null}]"#
        );
    }

    #[test]
    fn test_match_result_constructors() {
        let hit = MatchResult::exact("foo", CanonicalEpisode::new(1, 2, "Foo"));
        assert!(hit.is_match());
        assert_eq!(hit.score, EXACT_SCORE);

        let miss = MatchResult::no_match("bar");
        assert!(!miss.is_match());
        assert_eq!(miss.score, 0.0);
        assert!(miss.matched_title.is_none());
    }
}
