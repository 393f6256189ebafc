//! Utility functions.

pub mod fs;
pub mod hash;
