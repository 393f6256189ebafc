//! Plan generation module.
//!
//! Coordinates the planning process:
//! 1. Parse each filename (unparseable files are skipped and reported)
//! 2. Fetch the canonical episode list once per distinct show/season
//! 3. Match titles to canonical episodes, asking the LLM when configured
//!    and the deterministic path is not confident
//! 4. Compute target paths and synthesize the plan

use crate::core::matcher::EpisodeMatcher;
use crate::core::parser::{FilenameParser, ParsedFilenameInfo, ParserConfig};
use crate::core::prompts::{anthology_prompt, disambiguation_prompt};
use crate::core::sanitizer::{parse_disambiguation, parse_llm_segments, segments_from_records};
use crate::core::scanner::scan_directory;
use crate::core::segmenter::{overlapping, segment_title, strip_preamble};
use crate::core::synthesizer::{Candidate, PlanSynthesizer};
use crate::generators::filename::{episode_target_path, EpisodeTarget};
use crate::models::config::RuleConfig;
use crate::models::episode::CanonicalEpisode;
use crate::models::plan::{PlanOutcome, RenamePlan, SkippedFile};
use crate::services::provider::{Completion, EpisodeProvider, EpisodeQuery};
use crate::utils::fs::file_name_string;
use crate::{Error, Result};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Candidates offered to the model when a title is ambiguous.
const DISAMBIGUATION_CANDIDATES: usize = 5;

/// A parsed file waiting to be matched.
#[derive(Debug, Clone)]
struct Job {
    source: PathBuf,
    filename: String,
    info: ParsedFilenameInfo,
    show: String,
    season: u16,
}

impl Job {
    fn query(&self, provider_id: Option<&str>) -> EpisodeQuery {
        EpisodeQuery::new(&self.show, self.season)
            .with_year(self.info.year)
            .with_provider_hint(provider_id.map(str::to_string))
    }
}

/// Plan generator.
pub struct Planner<P, C> {
    rules: RuleConfig,
    target_root: PathBuf,
    parser: FilenameParser,
    matcher: EpisodeMatcher,
    synthesizer: PlanSynthesizer,
    provider: P,
    llm: Option<C>,
}

impl<P: EpisodeProvider, C: Completion> Planner<P, C> {
    /// Create a planner writing targets under `target_root`.
    pub fn new(provider: P, llm: Option<C>, rules: RuleConfig, target_root: impl Into<PathBuf>) -> Self {
        Self {
            parser: FilenameParser::with_config(ParserConfig::from(&rules)),
            matcher: EpisodeMatcher::with_ratio(rules.acceptance_ratio),
            synthesizer: PlanSynthesizer::with_verify(rules.verify),
            target_root: target_root.into(),
            provider,
            llm,
            rules,
        }
    }

    /// Scan `source` and plan every video found.
    pub async fn plan_directory(&self, source: &Path) -> Result<PlanOutcome> {
        tracing::info!("Generating plan for {:?}", source);
        tracing::info!("Target directory: {:?}", self.target_root);
        let scan = scan_directory(source)?;
        if scan.videos.is_empty() {
            tracing::warn!("No video files found in {:?}", source);
        }
        Ok(self.plan(&scan.paths()).await)
    }

    /// Plan a batch of files. Never fails as a whole: every file ends up
    /// either in the plan or in the skipped list.
    pub async fn plan(&self, files: &[PathBuf]) -> PlanOutcome {
        let mut skipped = Vec::new();
        let mut jobs = Vec::with_capacity(files.len());

        for path in files {
            match self.prepare(path) {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    skipped.push(SkippedFile {
                        source: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let catalogs = self.fetch_catalogs(&jobs).await;

        let mut candidates = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let episodes = catalogs
                .get(&self.query_for(job))
                .map(Vec::as_slice)
                .unwrap_or_default();

            let candidate = match self.resolve(job, episodes).await {
                Ok(matched) => Candidate::matched(&job.source, self.target_for(job, &matched)),
                Err(reason) => {
                    tracing::debug!("No match for {:?}: {}", job.filename, reason);
                    Candidate::failed(&job.source, reason)
                }
            };
            candidates.push(candidate);
        }

        let plan = self.synthesizer.synthesize(candidates);
        tracing::info!(
            "Planned {} files, skipped {} unparseable",
            plan.len(),
            skipped.len()
        );
        PlanOutcome { plan, skipped }
    }

    fn query_for(&self, job: &Job) -> EpisodeQuery {
        job.query(self.rules.provider_id.as_deref())
    }

    fn prepare(&self, path: &Path) -> Result<Job> {
        let filename = file_name_string(path);
        let info = self.parser.parse(&filename)?;

        let show = non_empty(self.rules.show_name.clone())
            .or_else(|| non_empty(Some(info.show.clone())))
            .or_else(|| show_from_path(path))
            .ok_or_else(|| Error::Parse(format!("no show name for {}", filename)))?;
        let season = self.rules.season.unwrap_or(info.season);

        Ok(Job {
            source: path.to_path_buf(),
            filename,
            info,
            show,
            season,
        })
    }

    /// Fetch each distinct episode list once, concurrently. A failing
    /// provider yields an empty list.
    async fn fetch_catalogs(&self, jobs: &[Job]) -> HashMap<EpisodeQuery, Vec<CanonicalEpisode>> {
        let mut queries: Vec<EpisodeQuery> = Vec::new();
        for job in jobs {
            let query = self.query_for(job);
            if !queries.contains(&query) {
                queries.push(query);
            }
        }

        let results = join_all(
            queries
                .iter()
                .map(|query| self.provider.fetch_episode_list(query)),
        )
        .await;

        queries
            .into_iter()
            .zip(results)
            .map(|(query, result)| {
                let episodes = match result {
                    Ok(episodes) => episodes,
                    Err(e) => {
                        tracing::warn!(
                            "{} lookup failed for {} season {}: {}",
                            self.provider.name(),
                            query.show,
                            query.season,
                            e
                        );
                        Vec::new()
                    }
                };
                (query, episodes)
            })
            .collect()
    }

    /// Decide which canonical episodes a file holds.
    async fn resolve(
        &self,
        job: &Job,
        episodes: &[CanonicalEpisode],
    ) -> std::result::Result<Vec<CanonicalEpisode>, String> {
        if episodes.is_empty() {
            return Err(format!(
                "no canonical episodes for {} season {}",
                job.show, job.season
            ));
        }

        let title = job
            .info
            .title
            .as_deref()
            .map(|t| strip_preamble(t, &job.show))
            .filter(|t| !t.trim().is_empty());

        let Some(title) = title else {
            return lookup_numbers(job.season, &job.info.episodes, episodes);
        };

        if self.rules.anthology || job.info.anthology {
            if let Some(matched) = self.match_anthology(job, &title, episodes).await {
                return Ok(matched);
            }
            if job.info.is_span() {
                return lookup_numbers(job.season, &job.info.episodes, episodes);
            }
            return Err(format!("no confident match for anthology title {:?}", title));
        }

        if job.info.is_span() {
            return lookup_numbers(job.season, &job.info.episodes, episodes);
        }

        if let Some(episode) = self.match_single(job, &title, episodes).await {
            if episode.episode != job.info.first_episode() {
                tracing::warn!(
                    "{:?}: title matches E{:02}, filename says E{:02}",
                    job.filename,
                    episode.episode,
                    job.info.first_episode()
                );
            }
            return Ok(vec![episode]);
        }

        Err(format!("no confident match for {:?}", title))
    }

    /// Split an anthology title and match every segment.
    async fn match_anthology(
        &self,
        job: &Job,
        title: &str,
        episodes: &[CanonicalEpisode],
    ) -> Option<Vec<CanonicalEpisode>> {
        let segments = segment_title(title, &job.show, episodes);
        let mut matched = Vec::new();
        let mut complete = !segments.is_empty();

        for segment in &segments {
            let pool = overlapping(segment, episodes);
            let found = if pool.is_empty() {
                self.matcher.find_best(segment, episodes).episode.cloned()
            } else {
                self.matcher.find_best(segment, &pool).episode.cloned().cloned()
            };

            match found {
                Some(episode) => matched.push(episode),
                None => {
                    tracing::debug!("Segment {:?} of {:?} unmatched", segment, job.filename);
                    complete = false;
                }
            }
        }

        if complete && !matched.is_empty() {
            return Some(sorted_unique(matched));
        }

        let llm = self.llm.as_ref()?;
        self.llm_segments(llm, job, episodes).await
    }

    /// Ask the model to split the file into segments.
    async fn llm_segments(
        &self,
        llm: &C,
        job: &Job,
        episodes: &[CanonicalEpisode],
    ) -> Option<Vec<CanonicalEpisode>> {
        let prompt = anthology_prompt(&job.show, job.season, &job.filename, episodes);
        let raw = match llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("LLM unavailable for {:?}: {}", job.filename, e);
                return None;
            }
        };

        let records = match parse_llm_segments(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Falling back to deterministic matching for {:?}: {}", job.filename, e);
                return None;
            }
        };

        let segments = segments_from_records(&records);
        if segments.is_empty() {
            return None;
        }

        let mut matched = Vec::with_capacity(segments.len());
        for segment in &segments {
            let found = self
                .matcher
                .find_best(&segment.title, episodes)
                .episode
                .cloned()
                .or_else(|| {
                    let number = segment.episode.as_deref().and_then(episode_number_from_code)?;
                    find_episode(episodes, job.season, number).cloned()
                });
            matched.push(found?);
        }
        tracing::debug!("LLM split {:?} into {} episodes", job.filename, matched.len());
        Some(sorted_unique(matched))
    }

    /// Match a single title, asking the model to pick among the closest
    /// candidates when the fuzzy match is too weak.
    async fn match_single(
        &self,
        job: &Job,
        title: &str,
        episodes: &[CanonicalEpisode],
    ) -> Option<CanonicalEpisode> {
        let result = self.matcher.match_episode(title, episodes);
        if let Some(episode) = result.episode {
            tracing::debug!(
                "{:?} -> {:?} ({:.1})",
                title,
                result.matched_title,
                result.score
            );
            return Some(episode);
        }

        let llm = self.llm.as_ref()?;
        let candidates = self
            .matcher
            .top_candidates(title, episodes, DISAMBIGUATION_CANDIDATES);
        if candidates.is_empty() {
            return None;
        }

        let prompt = disambiguation_prompt(&job.show, title, &candidates);
        let raw = match llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("LLM unavailable for {:?}: {}", job.filename, e);
                return None;
            }
        };

        let selected = parse_disambiguation(&raw, &candidates);
        let pick = selected.first()?;
        tracing::debug!("LLM picked {:?} for {:?}", pick, title);
        self.matcher.match_episode(pick, episodes).episode
    }

    fn target_for(&self, job: &Job, matched: &[CanonicalEpisode]) -> PathBuf {
        let target = EpisodeTarget {
            show: &job.show,
            year: job.info.year,
            season: job.season,
            episodes: matched,
            extension: job.info.extension.as_deref(),
        };
        episode_target_path(&self.target_root, self.rules.platform, &target)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Show name from the directory layout: the parent folder, or the one above
/// it when the parent is a season folder.
fn show_from_path(path: &Path) -> Option<String> {
    let parent = path.parent()?;
    let name = parent.file_name()?.to_string_lossy().to_string();
    let lower = name.to_lowercase();
    let is_season_dir = lower == "specials"
        || lower
            .strip_prefix("season")
            .map(|rest| rest.trim().chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);

    if is_season_dir {
        let grandparent = parent.parent()?.file_name()?.to_string_lossy().to_string();
        non_empty(Some(grandparent))
    } else {
        non_empty(Some(name))
    }
}

fn find_episode(episodes: &[CanonicalEpisode], season: u16, number: u16) -> Option<&CanonicalEpisode> {
    episodes
        .iter()
        .find(|ep| ep.season == season && ep.episode == number)
}

/// Resolve episode numbers directly. Every number must exist.
fn lookup_numbers(
    season: u16,
    numbers: &[u16],
    episodes: &[CanonicalEpisode],
) -> std::result::Result<Vec<CanonicalEpisode>, String> {
    if numbers.is_empty() {
        return Err("no episode numbers".to_string());
    }
    numbers
        .iter()
        .map(|&n| {
            find_episode(episodes, season, n)
                .cloned()
                .ok_or_else(|| format!("S{:02}E{:02} not in canonical list", season, n))
        })
        .collect()
}

/// Episode number from `S01E02`, `E02` or `2`.
fn episode_number_from_code(code: &str) -> Option<u16> {
    let lower = code.trim().to_lowercase();
    let digits_from = lower.find('e').map(|i| i + 1).unwrap_or(0);
    let digits: String = lower[digits_from..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|n| *n > 0)
}

fn sorted_unique(mut episodes: Vec<CanonicalEpisode>) -> Vec<CanonicalEpisode> {
    episodes.sort_by_key(|ep| (ep.season, ep.episode));
    episodes.dedup_by_key(|ep| (ep.season, ep.episode));
    episodes
}

/// Save a plan to a JSON file.
pub fn save_plan(plan: &RenamePlan, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(json.as_bytes())?;

    tracing::info!("Plan saved to {:?}", path);
    Ok(())
}

/// Load a plan from a JSON file.
pub fn load_plan(path: &Path) -> Result<RenamePlan> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::InvalidPlanFile(format!("{}: {}", path.display(), e)))
}

/// Get the default plan output path.
/// Saves to target directory if provided, otherwise to source directory.
pub fn default_plan_path(source: &Path, target: Option<&Path>) -> PathBuf {
    let filename = format!("plan_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
    target.unwrap_or(source).join(filename)
}

/// Save a plan under `sessions_dir/<timestamp>_<id>/plan.json`.
pub fn save_to_sessions(plan: &RenamePlan, sessions_dir: &Path) -> Result<PathBuf> {
    let session_id = format!(
        "{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &Uuid::new_v4().simple().to_string()[..8]
    );

    let session_dir = sessions_dir.join(&session_id);
    fs::create_dir_all(&session_dir)?;
    save_plan(plan, &session_dir.join("plan.json"))?;

    tracing::info!("Session saved: {}", session_id);
    Ok(session_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_path() {
        let source = Path::new("/tmp/shows");
        let target = Path::new("/tmp/shows_organized");

        let path = default_plan_path(source, Some(target));
        assert!(path.to_string_lossy().contains("plan_"));
        assert!(path.to_string_lossy().ends_with(".json"));
        assert!(path.starts_with(target));

        let path = default_plan_path(source, None);
        assert!(path.starts_with(source));
    }

    #[test]
    fn test_show_from_path() {
        assert_eq!(
            show_from_path(Path::new("/tv/Paw Patrol/Season 01/S01E01.mkv")).as_deref(),
            Some("Paw Patrol")
        );
        assert_eq!(
            show_from_path(Path::new("/tv/Bluey/S01E01.mkv")).as_deref(),
            Some("Bluey")
        );
        assert_eq!(
            show_from_path(Path::new("/tv/Bluey/Specials/S00E01.mkv")).as_deref(),
            Some("Bluey")
        );
    }

    #[test]
    fn test_episode_number_from_code() {
        assert_eq!(episode_number_from_code("S01E02"), Some(2));
        assert_eq!(episode_number_from_code("s01e12-e13"), Some(12));
        assert_eq!(episode_number_from_code("E7"), Some(7));
        assert_eq!(episode_number_from_code("3"), Some(3));
        assert_eq!(episode_number_from_code("pilot"), None);
        assert_eq!(episode_number_from_code("0"), None);
    }

    #[test]
    fn test_lookup_numbers_requires_every_number() {
        let episodes = vec![
            CanonicalEpisode::new(1, 1, "A"),
            CanonicalEpisode::new(1, 2, "B"),
        ];
        assert_eq!(lookup_numbers(1, &[1, 2], &episodes).unwrap().len(), 2);
        assert!(lookup_numbers(1, &[2, 3], &episodes).is_err());
        assert!(lookup_numbers(2, &[1], &episodes).is_err());
        assert!(lookup_numbers(1, &[], &episodes).is_err());
    }

    #[test]
    fn test_sorted_unique() {
        let eps = sorted_unique(vec![
            CanonicalEpisode::new(1, 3, "C"),
            CanonicalEpisode::new(1, 1, "A"),
            CanonicalEpisode::new(1, 3, "C"),
        ]);
        assert_eq!(eps.iter().map(|e| e.episode).collect::<Vec<_>>(), vec![1, 3]);
    }
}
