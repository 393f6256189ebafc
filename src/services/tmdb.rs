//! TMDB API client.
//!
//! Implements [`EpisodeProvider`]: a show is resolved with a TV search and
//! its season listing becomes the canonical episode list.

use crate::models::config::TmdbConfig;
use crate::models::episode::{normalize_episode_records, CanonicalEpisode};
use crate::services::provider::{EpisodeProvider, EpisodeQuery};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::future::Future;

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API client.
pub struct TmdbClient {
    api_key: String,
    language: String,
    /// Bearer token authentication (API v4 style)
    use_bearer: bool,
    base_url: String,
    client: reqwest::Client,
}

/// TV search result.
#[derive(Debug, Deserialize)]
pub struct TvSearchResult {
    pub results: Vec<TvSearchItem>,
}

/// TV search item.
#[derive(Debug, Clone, Deserialize)]
pub struct TvSearchItem {
    pub id: u64,
    pub name: String,
    pub original_name: String,
    pub first_air_date: Option<String>,
}

/// Season details. Episodes stay as raw records until normalized, since
/// TMDB rows for unaired or special episodes are often incomplete.
#[derive(Debug, Deserialize)]
pub struct SeasonDetails {
    pub id: u64,
    pub name: String,
    pub season_number: u16,
    #[serde(default)]
    pub episodes: Vec<Map<String, Value>>,
}

impl SeasonDetails {
    /// Episodes with valid numbering, as canonical episodes.
    pub fn canonical_episodes(&self) -> Vec<CanonicalEpisode> {
        normalize_episode_records(&self.episodes)
    }
}

impl TmdbClient {
    /// Create a new TMDB client. Fails when no API key is configured.
    pub fn new(config: &TmdbConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(Error::TmdbApiKeyMissing)?;

        // Bearer tokens start with "eyJ" (base64 encoded JWT header)
        let use_bearer = api_key.starts_with("eyJ");

        Ok(Self {
            api_key,
            language: config.language.clone(),
            use_bearer,
            base_url: TMDB_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a request with proper authentication.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        if self.use_bearer {
            request.header("Authorization", format!("Bearer {}", self.api_key))
        } else {
            request
        }
    }

    /// Build URL with optional api_key parameter (only for v3 style).
    fn build_url(&self, path: &str, extra_params: &str) -> String {
        if self.use_bearer {
            format!(
                "{}/{}?language={}{}",
                self.base_url, path, self.language, extra_params
            )
        } else {
            format!(
                "{}/{}?api_key={}&language={}{}",
                self.base_url, path, self.api_key, self.language, extra_params
            )
        }
    }

    /// Search for TV shows.
    pub async fn search_tv(&self, query: &str, year: Option<u16>) -> Result<Vec<TvSearchItem>> {
        let year_param = year
            .map(|y| format!("&first_air_date_year={}", y))
            .unwrap_or_default();
        let url = self.build_url(
            "search/tv",
            &format!("&query={}{}", urlencoding::encode(query), year_param),
        );
        let resp: TvSearchResult = self
            .build_request(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.results)
    }

    /// Get season details. A season TMDB does not know is `None`.
    pub async fn get_season_details(
        &self,
        tv_id: u64,
        season_number: u16,
    ) -> Result<Option<SeasonDetails>> {
        let url = self.build_url(&format!("tv/{}/season/{}", tv_id, season_number), "");
        let resp = self.build_request(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let details = resp.error_for_status()?.json().await?;
        Ok(Some(details))
    }

    async fn episode_list(&self, query: &EpisodeQuery) -> Result<Vec<CanonicalEpisode>> {
        let tv_id = match hinted_series_id(query) {
            Some(id) => id,
            None => {
                let results = self.search_tv(&query.show, query.year).await?;
                match pick_series(&query.show, &results) {
                    Some(item) => {
                        tracing::debug!("TMDB: {:?} -> {} ({})", query.show, item.name, item.id);
                        item.id
                    }
                    None => {
                        tracing::debug!("TMDB: no series found for {:?}", query.show);
                        return Ok(Vec::new());
                    }
                }
            }
        };

        let episodes = self
            .get_season_details(tv_id, query.season)
            .await?
            .map(|season| season.canonical_episodes())
            .unwrap_or_default();
        Ok(episodes)
    }
}

/// Series id given directly through the query hint, when it is numeric.
fn hinted_series_id(query: &EpisodeQuery) -> Option<u64> {
    query.provider_hint.as_deref()?.trim().parse().ok()
}

/// Pick the search result naming the show exactly, else the first result.
pub fn pick_series<'a>(show: &str, results: &'a [TvSearchItem]) -> Option<&'a TvSearchItem> {
    let wanted = show.trim().to_lowercase();
    results
        .iter()
        .find(|item| {
            item.name.to_lowercase() == wanted || item.original_name.to_lowercase() == wanted
        })
        .or_else(|| results.first())
}

impl EpisodeProvider for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    fn fetch_episode_list(
        &self,
        query: &EpisodeQuery,
    ) -> impl Future<Output = Result<Vec<CanonicalEpisode>>> + Send {
        async move {
            self.episode_list(query).await.map_err(|e| match e {
                Error::Http(e) => Error::ProviderUnavailable(format!("tmdb: {}", e)),
                other => other,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str) -> TmdbConfig {
        TmdbConfig {
            api_key: Some(key.to_string()),
            language: "en-US".to_string(),
        }
    }

    #[test]
    fn test_missing_api_key() {
        let config = TmdbConfig {
            api_key: None,
            language: "en-US".to_string(),
        };
        assert!(matches!(TmdbClient::new(&config), Err(Error::TmdbApiKeyMissing)));
    }

    #[test]
    fn test_build_url_v3_and_bearer() {
        let v3 = TmdbClient::new(&config("abc")).unwrap();
        assert_eq!(
            v3.build_url("tv/1/season/2", ""),
            "https://api.themoviedb.org/3/tv/1/season/2?api_key=abc&language=en-US"
        );

        let bearer = TmdbClient::new(&config("eyJtoken"))
            .unwrap()
            .with_base_url("http://localhost:9/");
        assert_eq!(
            bearer.build_url("search/tv", "&query=x"),
            "http://localhost:9/search/tv?language=en-US&query=x"
        );
    }

    #[test]
    fn test_pick_series_prefers_exact_name() {
        let results = vec![
            TvSearchItem {
                id: 1,
                name: "Paw Patrol: The Movie".into(),
                original_name: "Paw Patrol: The Movie".into(),
                first_air_date: None,
            },
            TvSearchItem {
                id: 2,
                name: "PAW Patrol".into(),
                original_name: "PAW Patrol".into(),
                first_air_date: Some("2013-08-12".into()),
            },
        ];
        assert_eq!(pick_series("Paw Patrol", &results).unwrap().id, 2);
        assert_eq!(pick_series("Something Else", &results).unwrap().id, 1);
        assert!(pick_series("Anything", &[]).is_none());
    }

    #[test]
    fn test_hinted_series_id() {
        let query = EpisodeQuery::new("Paw Patrol", 1);
        assert_eq!(hinted_series_id(&query), None);
        assert_eq!(
            hinted_series_id(&query.clone().with_provider_hint(Some("57532".into()))),
            Some(57532)
        );
        assert_eq!(
            hinted_series_id(&query.with_provider_hint(Some("tt123".into()))),
            None
        );
    }

    #[test]
    fn test_season_details_into_canonical() {
        let season: SeasonDetails = serde_json::from_str(
            r#"{"id": 9, "name": "Season 1", "season_number": 1, "episodes": [
                {"id": 1, "name": " Pups Make a Splash ", "episode_number": 1, "season_number": 1, "air_date": null},
                {"id": 2, "name": "Pups Save a Train", "episode_number": 2, "season_number": 1, "air_date": "2013-08-12"},
                {"id": 3, "name": "TBA", "episode_number": 0, "season_number": 1}
            ]}"#,
        )
        .unwrap();
        let episodes = season.canonical_episodes();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0], CanonicalEpisode::new(1, 1, "Pups Make a Splash"));
        assert_eq!(episodes[1].episode, 2);
    }
}
