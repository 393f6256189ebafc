//! Rename plan synthesis.
//!
//! Turns per-file outcomes into a [`RenamePlan`]. Items are sorted by
//! target path before anything else happens, so the plan depends only on
//! its inputs and never on directory enumeration order.

use crate::models::plan::{PlanStatus, RenamePlan, RenamePlanItem};
use crate::utils::hash::sha256_file;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One media file ready for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source: PathBuf,
    pub outcome: CandidateOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// A confident match with its computed target.
    Matched(PathBuf),
    /// No confident match.
    Failed(String),
}

impl Candidate {
    pub fn matched(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            outcome: CandidateOutcome::Matched(target.into()),
        }
    }

    pub fn failed(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            outcome: CandidateOutcome::Failed(reason.into()),
        }
    }
}

/// Builds rename plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanSynthesizer {
    verify: bool,
}

impl PlanSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record source checksums on pending items.
    pub fn with_verify(verify: bool) -> Self {
        Self { verify }
    }

    /// Synthesize a plan from candidates.
    pub fn synthesize(&self, candidates: Vec<Candidate>) -> RenamePlan {
        let mut items: Vec<RenamePlanItem> = candidates.into_iter().map(initial_item).collect();

        // Unreadable sources fall back to their own path before collisions
        // are counted.
        if self.verify {
            for item in items.iter_mut().filter(|i| i.status == PlanStatus::Pending) {
                match sha256_file(&item.source) {
                    Ok(checksum) => item.checksum = Some(checksum),
                    Err(e) => {
                        item.status = PlanStatus::Failed;
                        item.target = item.source.clone();
                        item.reason = Some(format!("cannot checksum source: {}", e));
                    }
                }
            }
        }

        items.sort_by(|a, b| {
            a.target
                .to_string_lossy()
                .cmp(&b.target.to_string_lossy())
                .then_with(|| a.source.cmp(&b.source))
        });

        mark_collisions(&mut items);

        for item in items.iter_mut().filter(|i| i.status == PlanStatus::Pending) {
            check_existing_target(item);
        }

        let plan = RenamePlan { items };
        tracing::info!(
            "Plan: {} pending, {} conflict, {} duplicate, {} failed",
            plan.count(PlanStatus::Pending),
            plan.count(PlanStatus::Conflict),
            plan.count(PlanStatus::Duplicate),
            plan.count(PlanStatus::Failed)
        );
        plan
    }
}

fn initial_item(candidate: Candidate) -> RenamePlanItem {
    match candidate.outcome {
        CandidateOutcome::Matched(target) => RenamePlanItem {
            source: candidate.source,
            target,
            status: PlanStatus::Pending,
            checksum: None,
            reason: None,
        },
        CandidateOutcome::Failed(reason) => RenamePlanItem {
            target: candidate.source.clone(),
            source: candidate.source,
            status: PlanStatus::Failed,
            checksum: None,
            reason: Some(reason),
        },
    }
}

/// Key under which two targets collide. Case-insensitive, since common
/// media filesystems are.
fn target_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Mark every item whose target collides with another item's target.
///
/// Failed items keep their source as target, so they take part too: a
/// matched file aimed at an unmatched file's location is a conflict. A
/// failed item stays failed unless it collides with another failed item.
fn mark_collisions(items: &mut [RenamePlanItem]) {
    let mut by_target: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        by_target.entry(target_key(&item.target)).or_default().push(idx);
    }

    for indices in by_target.values().filter(|v| v.len() > 1) {
        let failed = indices
            .iter()
            .filter(|&&idx| items[idx].status == PlanStatus::Failed)
            .count();

        for &idx in indices {
            if items[idx].status == PlanStatus::Failed && failed == 1 {
                continue;
            }
            let others: Vec<String> = indices
                .iter()
                .filter(|&&other| other != idx)
                .map(|&other| items[other].source.display().to_string())
                .collect();
            tracing::warn!(
                "Target collision: {:?} also claimed by {}",
                items[idx].target,
                others.join(", ")
            );
            items[idx].status = PlanStatus::Conflict;
            items[idx].reason = Some(format!("target also claimed by {}", others.join(", ")));
        }
    }
}

/// Resolve a pending item against what is already on disk at its target.
fn check_existing_target(item: &mut RenamePlanItem) {
    if !item.target.exists() {
        return;
    }

    let source_sum = match sha256_file(&item.source) {
        Ok(sum) => sum,
        Err(e) => {
            item.status = PlanStatus::Conflict;
            item.reason = Some(format!("target exists and source is unreadable: {}", e));
            return;
        }
    };

    let target_sum = if item.target == item.source {
        Ok(source_sum.clone())
    } else {
        sha256_file(&item.target)
    };

    match target_sum {
        Ok(target_sum) if target_sum == source_sum => {
            tracing::debug!("Already in place: {:?}", item.target);
            item.status = PlanStatus::Duplicate;
            item.checksum = Some(source_sum);
        }
        Ok(_) => {
            tracing::warn!("Target exists with different content: {:?}", item.target);
            item.status = PlanStatus::Conflict;
            item.reason = Some("target exists with different content".to_string());
        }
        Err(e) => {
            item.status = PlanStatus::Conflict;
            item.reason = Some(format!("target exists and is unreadable: {}", e));
        }
    }
}

/// Synthesize with default options (convenience function).
pub fn synthesize_plan(candidates: Vec<Candidate>) -> RenamePlan {
    PlanSynthesizer::new().synthesize(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_failed_items_keep_source_as_target() {
        let plan = synthesize_plan(vec![Candidate::failed("/in/x.mkv", "no match")]);
        assert_eq!(plan.items[0].status, PlanStatus::Failed);
        assert_eq!(plan.items[0].target, PathBuf::from("/in/x.mkv"));
        assert_eq!(plan.items[0].reason.as_deref(), Some("no match"));
    }

    #[test]
    fn test_items_sorted_by_target() {
        let plan = synthesize_plan(vec![
            Candidate::matched("/in/2.mkv", "/out/B.mkv"),
            Candidate::matched("/in/1.mkv", "/out/A.mkv"),
        ]);
        assert_eq!(plan.items[0].target, PathBuf::from("/out/A.mkv"));
        assert_eq!(plan.items[1].target, PathBuf::from("/out/B.mkv"));
        assert!(plan.items.iter().all(|i| i.status == PlanStatus::Pending));
    }

    #[test]
    fn test_collision_marks_both_items() {
        let plan = synthesize_plan(vec![
            Candidate::matched("/in/a.mkv", "/out/Show - S01E01.mkv"),
            Candidate::matched("/in/b.mkv", "/out/show - s01e01.mkv"),
            Candidate::matched("/in/c.mkv", "/out/Show - S01E02.mkv"),
        ]);
        assert_eq!(plan.count(PlanStatus::Conflict), 2);
        assert_eq!(plan.count(PlanStatus::Pending), 1);
        let conflict = plan.items.iter().find(|i| i.source == Path::new("/in/a.mkv")).unwrap();
        assert!(conflict.reason.as_deref().unwrap().contains("/in/b.mkv"));
    }

    #[test]
    fn test_target_of_failed_item_is_not_reused() {
        let plan = synthesize_plan(vec![
            Candidate::failed("/out/A.mkv", "no match"),
            Candidate::matched("/in/a.mkv", "/out/A.mkv"),
        ]);
        assert_eq!(plan.count(PlanStatus::Failed), 1);
        assert_eq!(plan.count(PlanStatus::Conflict), 1);
        assert_eq!(plan.count(PlanStatus::Pending), 0);

        let claimant = plan.items.iter().find(|i| i.source == Path::new("/in/a.mkv")).unwrap();
        assert!(claimant.reason.as_deref().unwrap().contains("/out/A.mkv"));

        let mut targets: Vec<_> = plan
            .items
            .iter()
            .filter(|i| i.status != PlanStatus::Conflict)
            .map(|i| target_key(&i.target))
            .collect();
        let before = targets.len();
        targets.dedup();
        assert_eq!(targets.len(), before);
    }

    #[test]
    fn test_distinct_failed_items_stay_failed() {
        let plan = synthesize_plan(vec![
            Candidate::failed("/in/x.mkv", "no match"),
            Candidate::failed("/in/y.mkv", "no match"),
            Candidate::matched("/in/z.mkv", "/out/Z.mkv"),
        ]);
        assert_eq!(plan.count(PlanStatus::Failed), 2);
        assert_eq!(plan.count(PlanStatus::Pending), 1);
    }

    #[test]
    fn test_existing_target_same_content_is_duplicate() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src.mkv");
        let target = dir.path().join("dst.mkv");
        std::fs::write(&source, b"video").unwrap();
        std::fs::write(&target, b"video").unwrap();

        let plan = synthesize_plan(vec![Candidate::matched(&source, &target)]);
        assert_eq!(plan.items[0].status, PlanStatus::Duplicate);
        assert!(plan.items[0].checksum.is_some());
    }

    #[test]
    fn test_existing_target_different_content_is_conflict() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src.mkv");
        let target = dir.path().join("dst.mkv");
        std::fs::write(&source, b"video").unwrap();
        std::fs::write(&target, b"other").unwrap();

        let plan = synthesize_plan(vec![Candidate::matched(&source, &target)]);
        assert_eq!(plan.items[0].status, PlanStatus::Conflict);
        assert_eq!(
            plan.items[0].reason.as_deref(),
            Some("target exists with different content")
        );
    }

    #[test]
    fn test_verify_records_source_checksum() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src.mkv");
        std::fs::write(&source, b"video").unwrap();

        let plan = PlanSynthesizer::with_verify(true)
            .synthesize(vec![Candidate::matched(&source, dir.path().join("out.mkv"))]);
        assert_eq!(plan.items[0].status, PlanStatus::Pending);
        assert_eq!(
            plan.items[0].checksum.as_deref(),
            Some(crate::utils::hash::sha256_hex(b"video").as_str())
        );
    }

    #[test]
    fn test_resynthesis_after_apply_has_no_pending() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("raw.mkv");
        let target = dir.path().join("Show").join("Season 01").join("Show - S01E01 - Pilot.mkv");
        std::fs::write(&source, b"pilot").unwrap();

        let plan = synthesize_plan(vec![Candidate::matched(&source, &target)]);
        assert_eq!(plan.count(PlanStatus::Pending), 1);

        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::rename(&source, &target).unwrap();

        // A rescan now finds the file at its target.
        let again = synthesize_plan(vec![Candidate::matched(&target, &target)]);
        assert_eq!(again.count(PlanStatus::Pending), 0);
        assert_eq!(again.items[0].status, PlanStatus::Duplicate);
    }
}
