//! Errors surfaced by the retrieval layer and the content API.

use thiserror::Error;

/// Everything that can go wrong between building a request and handing back a
/// parsed JSON document.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// The resilient fetcher used its full attempt budget without ever seeing
    /// an acceptable response.
    #[error("fetch_with_retry: exhausted retries after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// A single-shot request came back with a non-success status.
    #[error("fetch_text: response not ok: status={status}, status_text={status_text}, url={url}, options={options}")]
    NonSuccess {
        status: u16,
        status_text: String,
        url: String,
        options: String,
    },

    /// The transport failed before any response was available.
    #[error("transport error: {0}")]
    Transport(String),

    /// The body was not valid JSON.
    #[error("json parse failed: err={message}, text={text}, params={params}")]
    Parse {
        message: String,
        text: String,
        params: String,
    },

    /// A request body could not be serialized.
    #[error("json encode failed: {0}")]
    Encode(String),

    /// A request URL could not be assembled.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An epoch value that cannot be represented as a UTC timestamp.
    #[error("invalid unix timestamp: {0}")]
    InvalidTimestamp(i64),
}

impl ContentError {
    /// Builds a `Parse` error from a serde failure, the raw body and whatever
    /// describes the originating request.
    pub fn parse(err: &serde_json::Error, text: &str, params: impl Into<String>) -> Self {
        ContentError::Parse {
            message: err.to_string(),
            text: text.to_string(),
            params: params.into(),
        }
    }
}
