//! # HTTP Transport
//!
//! The seam between the content API and the network. Everything above this
//! module talks to a [`Transport`], which takes a URL plus [`RequestOptions`]
//! and hands back a fully read [`TransportResponse`]. Production code uses
//! [`ReqwestTransport`]; tests plug in scripted transports.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::Serialize;

use crate::retrieve::error::ContentError;
use crate::retrieve::mask_api_key;

/// The HTTP verbs the content layer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }
}

/// Request options, serializable so failures can report exactly what was sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestOptions {
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestOptions {
    /// A plain GET with no headers.
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST carrying `body` serialized as JSON, with the matching content type.
    pub fn post_json<T: Serialize>(body: &T) -> Result<Self, ContentError> {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.as_str().to_string(), "application/json".to_string());
        Ok(Self {
            method: HttpMethod::Post,
            headers,
            body: Some(serde_json::to_string(body).map_err(|e| ContentError::Encode(e.to_string()))?),
        })
    }

    /// JSON rendering used in diagnostics and error messages.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// A response whose body has already been read.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl TransportResponse {
    /// Builds a response, deriving the status text from the status code.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    /// True for any 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one HTTP request. Implementations must not retry on their own; retry
/// is layered above by [`crate::retrieve::resilient::fetch_with_retry`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<TransportResponse, ContentError>;
}

/// [`Transport`] backed by a middleware-enabled reqwest client.
///
/// No retry middleware is attached: the attempt budget is owned by the
/// caller's `RetryPolicy`.
pub struct ReqwestTransport {
    inner: ClientWithMiddleware,
    request_timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, ContentError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ContentError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            inner: ClientBuilder::new(client).build(),
            request_timeout,
        })
    }

    /// Wraps an already configured client, e.g. one carrying extra middleware.
    pub fn from_client(inner: ClientWithMiddleware, request_timeout: Duration) -> Self {
        Self { inner, request_timeout }
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<TransportResponse, ContentError> {
        let mut req = self.inner.request(options.method.into(), url);

        for (name, value) in &options.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &options.body {
            req = req.body(body.clone());
        }

        let response: reqwest::Response = req
            .send()
            .await
            .map_err(|e| ContentError::Transport(mask_api_key(&e.to_string())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ContentError::Transport(mask_api_key(&e.to_string())))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_json_sets_method_header_and_body() {
        let options = RequestOptions::post_json(&serde_json::json!({"queryString": "x"})).unwrap();
        assert_eq!(options.method, HttpMethod::Post);
        assert_eq!(options.headers.get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(options.body.as_deref(), Some(r#"{"queryString":"x"}"#));
    }

    #[test]
    fn test_post_json_reports_unencodable_body() {
        let mut body = std::collections::HashMap::new();
        body.insert((1u8, 2u8), "tuple keys are not valid JSON object keys");

        let err = RequestOptions::post_json(&body).unwrap_err();
        assert!(matches!(err, ContentError::Encode(_)));
        assert!(err.to_string().starts_with("json encode failed:"));
    }

    #[test]
    fn test_get_options_serialize_compactly() {
        assert_eq!(RequestOptions::get().to_json_string(), r#"{"method":"GET"}"#);
    }

    #[test]
    fn test_response_status_text_and_ok() {
        let res = TransportResponse::new(500, "");
        assert_eq!(res.status_text, "Internal Server Error");
        assert!(!res.ok());
        assert!(TransportResponse::new(204, "").ok());
    }
}
