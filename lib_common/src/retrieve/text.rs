//! # Text Responder
//!
//! One request, no retry. A 2xx response resolves with the body text; anything
//! else becomes a [`ContentError::NonSuccess`] carrying the status code, status
//! text, (masked) URL and the serialized request options.

use crate::retrieve::error::ContentError;
use crate::retrieve::mask_api_key;
use crate::retrieve::transport::{RequestOptions, Transport, TransportResponse};

/// Fetches `url` once and returns the whole body as text.
///
/// Parsing is left to the caller.
pub async fn fetch_text(transport: &dyn Transport, url: &str, options: &RequestOptions) -> Result<String, ContentError> {
    let res = transport.send(url, options).await?;
    body_if_ok(res, url, options)
}

/// Unwraps the body of an acceptable response, or describes why it was not.
pub(crate) fn body_if_ok(res: TransportResponse, url: &str, options: &RequestOptions) -> Result<String, ContentError> {
    if res.ok() {
        Ok(res.body)
    } else {
        Err(ContentError::NonSuccess {
            status: res.status,
            status_text: res.status_text,
            url: mask_api_key(url),
            options: options.to_json_string(),
        })
    }
}
