//! # Configuration Modules
//!
//! Settings for the content retrieval layer: defaults, an optional JSON file
//! and the process environment.

/// Layered content configuration with a mandatory API key.
pub mod config_content;
