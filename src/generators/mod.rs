//! Target name generators.

pub mod filename;
