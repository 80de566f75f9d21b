//! # Data Retrieval Module
//!
//! Networking for the content layer. Everything that touches HTTP lives here so
//! the content API can focus on query construction and response handling.
//!
//! ## Contained Modules:
//!
//! - **`transport`**: the `Transport` seam and its reqwest-backed implementation.
//! - **`resilient`**: bounded retry over a transport, driven by a `RetryPolicy`.
//! - **`text`**: single-shot "read the whole body as text" requests.
//! - **`timings`**: per-call duration bookkeeping for the fetch summary.
//! - **`error`**: the `ContentError` taxonomy.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

/// Error taxonomy shared by retrieval and the content API.
pub mod error;
/// Bounded retry over a transport.
pub mod resilient;
/// Single-shot body-as-text requests.
pub mod text;
/// Per-call timing records and their summary.
pub mod timings;
/// The HTTP transport seam.
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

/// Replaces the value of every `apiKey` query parameter with `*****` so URLs can
/// be logged and embedded in errors. The value ends at `&`, `#`, `)`, a quote
/// or whitespace.
pub fn mask_api_key(url: &str) -> String {
    const NEEDLE: &str = "apiKey=";
    let mut masked = String::with_capacity(url.len());
    let mut rest = url;

    while let Some(idx) = rest.find(NEEDLE) {
        let value_start = idx + NEEDLE.len();
        masked.push_str(&rest[..value_start]);
        masked.push_str("*****");
        rest = &rest[value_start..];
        let value_end = rest
            .find(|c: char| matches!(c, '&' | '#' | ')' | '"') || c.is_whitespace())
            .unwrap_or(rest.len());
        rest = &rest[value_end..];
    }
    masked.push_str(rest);
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key_hides_key() {
        let masked = mask_api_key("http://api.ft.com/enrichedcontent/abc?apiKey=secret");
        assert_eq!(masked, "http://api.ft.com/enrichedcontent/abc?apiKey=*****");
    }

    #[test]
    fn test_mask_api_key_keeps_following_params() {
        let masked = mask_api_key("http://h/c?identifierValue=x&apiKey=secret&authority=y");
        assert_eq!(masked, "http://h/c?identifierValue=x&apiKey=*****&authority=y");
    }

    #[test]
    fn test_mask_api_key_keeps_surrounding_error_text() {
        let masked = mask_api_key("error sending request for url (http://h/c?apiKey=secret): connection refused");
        assert_eq!(
            masked,
            "error sending request for url (http://h/c?apiKey=*****): connection refused"
        );
        assert_eq!(mask_api_key("apiKey=secret next"), "apiKey=***** next");
    }

    #[test]
    fn test_mask_api_key_without_key_is_identity() {
        assert_eq!(mask_api_key("http://h/c?q=1"), "http://h/c?q=1");
    }
}
