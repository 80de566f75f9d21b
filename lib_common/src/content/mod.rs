//! # Content Module
//!
//! Query construction, the public content retrieval operations and the
//! per-article image URL cache.
//!
//! ## Contained Modules:
//!
//! - **`query`**: pure translation of loose search parameters into the search
//!   document.
//! - **`api`**: `ContentApi`, the operations exposed to collaborators.
//! - **`image_cache`**: injected lookaside cache of resolved image URLs.

#![forbid(unsafe_code)]

pub mod api;
pub mod image_cache;
pub mod query;
