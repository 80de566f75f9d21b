//! # lib_common
//!
//! Editorial-content retrieval layer for the correlations engine: builds
//! structured search queries, talks to the remote content and search APIs with
//! bounded retry, and caches derived per-article facts.
//!
//! Each top-level folder is gated behind a cargo feature of the same name.

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "content")]
pub mod content;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;

// Re-export the most used types
#[cfg(feature = "configs")]
pub use configs::config_content::{ConfigError, ContentConfig, load_content_config};
#[cfg(feature = "content")]
pub use content::api::{ContentApi, LenientResult, SearchResult, StrictResult};
#[cfg(feature = "content")]
pub use content::image_cache::ImageUrlCache;
#[cfg(feature = "content")]
pub use content::query::{SearchParams, SearchQueryDocument, build_query};
#[cfg(feature = "loggers")]
pub use loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
#[cfg(feature = "retrieve")]
pub use retrieve::error::ContentError;
#[cfg(feature = "retrieve")]
pub use retrieve::resilient::{Backoff, RetryPolicy, fetch_with_retry};
#[cfg(feature = "retrieve")]
pub use retrieve::text::fetch_text;
#[cfg(feature = "retrieve")]
pub use retrieve::transport::{HttpMethod, ReqwestTransport, RequestOptions, Transport, TransportResponse};
