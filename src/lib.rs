//! Media Renamer Library
//!
//! Reconciles loosely structured episode filenames with canonical episode
//! lists and produces a deterministic, conflict-aware rename plan.

pub mod cli;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
