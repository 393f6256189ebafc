//! Configuration model.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default time-to-live for cached provider lookups (one day).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ollama configuration.
    pub ollama: OllamaConfig,
    /// TMDB configuration.
    pub tmdb: TmdbConfig,
    /// Provider cache configuration.
    pub cache: CacheConfig,
    /// Naming and matching rules.
    pub rules: RuleConfig,
    /// Sessions directory.
    pub sessions_dir: PathBuf,
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Service URL.
    pub base_url: String,
    /// Model to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

/// TMDB configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// API key.
    pub api_key: Option<String>,
    /// Language for responses.
    pub language: String,
}

/// Provider cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether lookups go through the cache at all.
    pub enabled: bool,
    /// SQLite database holding cached entries.
    pub path: PathBuf,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
}

/// Target naming convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Plex,
    Jellyfin,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Plex => write!(f, "plex"),
            Platform::Jellyfin => write!(f, "jellyfin"),
        }
    }
}

/// Rules applied while parsing, matching and naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Naming convention for target paths.
    pub platform: Platform,
    /// Accept only `SxxEyy` markers.
    pub strict_structure: bool,
    /// Treat every file as a potential anthology.
    pub anthology: bool,
    /// Record source checksums on pending items.
    pub verify: bool,
    /// Model used for disambiguation, if any.
    pub llm_model: Option<String>,
    /// Show name override.
    pub show_name: Option<String>,
    /// Season override.
    pub season: Option<u16>,
    /// Provider series id (the TMDB id), skipping the show search.
    pub provider_id: Option<String>,
    /// Words that hint a title holds several episodes.
    pub anthology_keywords: Vec<String>,
    /// Minimum fuzzy ratio for a match.
    pub acceptance_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            tmdb: TmdbConfig::default(),
            cache: CacheConfig::default(),
            rules: RuleConfig::default(),
            sessions_dir: dirs_config_path().join("sessions"),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5:7b".to_string()),
            timeout: 120,
        }
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("TMDB_API_KEY").ok(),
            language: "en-US".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: dirs_cache_path().join("provider_cache.db"),
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Cache config rooted at an explicit database path.
    pub fn at(path: impl AsRef<Path>, ttl_secs: u64) -> Self {
        Self {
            enabled: true,
            path: path.as_ref().to_path_buf(),
            ttl_secs,
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Plex,
            strict_structure: false,
            anthology: false,
            verify: false,
            llm_model: None,
            show_name: None,
            season: None,
            provider_id: None,
            anthology_keywords: default_anthology_keywords(),
            acceptance_ratio: 0.6,
        }
    }
}

/// Default anthology hint words.
pub fn default_anthology_keywords() -> Vec<String> {
    ["and", "&", "plus", "with"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Get the configuration directory path.
fn dirs_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media_renamer")
}

/// Get the cache directory path.
fn dirs_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media_renamer")
}

/// Load configuration from the default location.
pub fn load_config() -> Config {
    load_config_from(&dirs_config_path().join("config.toml"))
}

/// Load configuration from a file, falling back to defaults.
pub fn load_config_from(config_path: &Path) -> Config {
    if config_path.exists() {
        match std::fs::read_to_string(config_path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring invalid config {:?}: {}", config_path, e),
            },
            Err(e) => tracing::warn!("Cannot read config {:?}: {}", config_path, e),
        }
    }

    Config::default()
}
