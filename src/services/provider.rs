//! Boundary contracts for the external collaborators: a canonical episode
//! source and a text-completion model.

use crate::models::episode::CanonicalEpisode;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Arguments of one episode-list lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeQuery {
    /// Show name as parsed from the filename.
    pub show: String,
    /// Season number.
    pub season: u16,
    /// Release year, when known.
    pub year: Option<u16>,
    /// Provider-specific hint (for example a known series id).
    pub provider_hint: Option<String>,
}

impl EpisodeQuery {
    pub fn new(show: impl Into<String>, season: u16) -> Self {
        Self {
            show: show.into(),
            season,
            year: None,
            provider_hint: None,
        }
    }

    pub fn with_year(mut self, year: Option<u16>) -> Self {
        self.year = year;
        self
    }

    pub fn with_provider_hint(mut self, hint: Option<String>) -> Self {
        self.provider_hint = hint;
        self
    }
}

/// A source of canonical episode lists.
///
/// An unknown show is an empty list, not an error. Errors mean the provider
/// itself could not be reached.
pub trait EpisodeProvider: Send + Sync {
    /// Stable name used in cache keys and logs.
    fn name(&self) -> &str;

    /// Fetch the ordered episode list of one season.
    fn fetch_episode_list(
        &self,
        query: &EpisodeQuery,
    ) -> impl Future<Output = Result<Vec<CanonicalEpisode>>> + Send;
}

/// A text-completion model.
pub trait Completion: Send + Sync {
    /// Complete `prompt` and return the raw response text.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

impl<T: EpisodeProvider> EpisodeProvider for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_episode_list(
        &self,
        query: &EpisodeQuery,
    ) -> impl Future<Output = Result<Vec<CanonicalEpisode>>> + Send {
        (**self).fetch_episode_list(query)
    }
}

impl<T: Completion> Completion for &T {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).complete(prompt)
    }
}
