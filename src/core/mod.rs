//! Core business logic modules.

pub mod matcher;
pub mod parser;
pub mod planner;
pub mod prompts;
pub mod sanitizer;
pub mod scanner;
pub mod segmenter;
pub mod synthesizer;
