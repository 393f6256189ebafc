//! Error types for the media renamer.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media renamer.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("TMDB API key not configured. Set TMDB_API_KEY environment variable")]
    TmdbApiKeyMissing,

    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    // Parse errors
    #[error("No season/episode pattern in filename: {0}")]
    Parse(String),

    #[error("Model output is not a list of mappings: {0}")]
    SanitizationDecode(String),

    // Cache errors
    #[error("Cache store unavailable: {0}")]
    CacheStore(#[from] rusqlite::Error),

    #[error("Cache store unavailable: {0}")]
    CacheIo(String),

    // Collaborator errors
    #[error("Episode provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Language model unavailable: {0}")]
    LlmUnavailable(String),

    // Plan errors
    #[error("Invalid plan file: {0}")]
    InvalidPlanFile(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
