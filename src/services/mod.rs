//! External service clients and the provider cache.

pub mod cache;
pub mod ollama;
pub mod provider;
pub mod tmdb;
