//! # Content Retrieval API
//!
//! The public surface used by the correlation engine and the display layer.
//! Operations are independent and independently awaitable.
//!
//! Failure contracts differ per operation and are part of the API:
//!
//! | Operation | Result shape |
//! |---|---|
//! | [`ContentApi::get_article`] | [`StrictResult`] |
//! | [`ContentApi::get_article_image_url`] | [`StrictResult`] |
//! | [`ContentApi::search`] and its variants | [`SearchResult`], `sapi_obj` absent on failure |
//! | [`ContentApi::resolve_legacy_identifier`] | [`LenientResult`] |
//! | [`ContentApi::call_v2`] | [`LenientResult`] |
//!
//! Every downgraded failure is logged before it is swallowed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use crate::configs::config_content::ContentConfig;
use crate::content::image_cache::ImageUrlCache;
use crate::content::query::{SearchParams, build_query};
use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::error::ContentError;
use crate::retrieve::mask_api_key;
use crate::retrieve::resilient::{self, Backoff, RetryPolicy};
use crate::retrieve::text::fetch_text;
use crate::retrieve::timings::{FetchTimings, TimedTransport, TimingsSummary};
use crate::retrieve::transport::{ReqwestTransport, RequestOptions, Transport, TransportResponse};

/// Success or an explicit error; the caller must handle the error.
pub type StrictResult<T> = Result<T, ContentError>;

/// Success or `None`; the failure has already been logged.
pub type LenientResult<T> = Option<T>;

const API_KEY_PARAM: &str = "apiKey";

/// Outcome of a search. `params` is always the caller's input; `sapi_obj` is
/// present only when the request succeeded and the body parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub params: SearchParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sapi_obj: Option<Value>,
}

impl SearchResult {
    fn failed(params: SearchParams) -> Self {
        Self { params, sapi_obj: None }
    }

    pub fn is_success(&self) -> bool {
        self.sapi_obj.is_some()
    }
}

/// Converts epoch seconds to ISO-8601 UTC with second precision, e.g.
/// `1590000000` to `2020-05-20T18:40:00Z`.
pub fn unix_time_to_iso(unix_secs: i64) -> StrictResult<String> {
    DateTime::<Utc>::from_timestamp(unix_secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or(ContentError::InvalidTimestamp(unix_secs))
}

fn probe_image_url(article: &Value) -> Result<String, &'static str> {
    let main_image = article
        .get("mainImage")
        .filter(|v| !v.is_null())
        .ok_or("no mainImage")?;
    let members = main_image
        .get("members")
        .and_then(Value::as_array)
        .ok_or("no mainImage.members")?;
    let first = members.first().ok_or("empty mainImage.members")?;
    first
        .get("binaryUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or("no mainImage.members[0].binaryUrl")
}

/// `mainImage.members[0].binaryUrl`, if every step of the path is present.
pub fn extract_image_url(article: &Value) -> Option<String> {
    probe_image_url(article).ok()
}

/// Retry policy described by `config`: fixed delay when `backoff_ms` is set,
/// immediate retries otherwise.
pub fn retry_policy_from(config: &ContentConfig) -> RetryPolicy {
    let backoff = match config.backoff_ms {
        0 => Backoff::None,
        ms => Backoff::Fixed(Duration::from_millis(ms)),
    };
    RetryPolicy::new(config.max_attempts, backoff)
}

pub struct ContentApi {
    config: ContentConfig,
    transport: Arc<dyn Transport>,
    timings: Arc<FetchTimings>,
    cache: Arc<ImageUrlCache>,
    logger: Arc<LoggerLocal>,
    retry: RetryPolicy,
}

impl ContentApi {
    /// Builds the API over `transport`. Every call is timed; `cache` is shared
    /// with whoever else holds it.
    pub fn new(
        config: ContentConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<ImageUrlCache>,
        logger: Arc<LoggerLocal>,
    ) -> Self {
        let timings = Arc::new(FetchTimings::default());
        let retry = retry_policy_from(&config);
        Self {
            config,
            transport: Arc::new(TimedTransport::new(transport, timings.clone())),
            timings,
            cache,
            logger,
            retry,
        }
    }

    /// Production wiring: reqwest transport with the configured timeout and a
    /// fresh cache.
    pub fn with_reqwest(config: ContentConfig, logger: Arc<LoggerLocal>) -> StrictResult<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(config, Arc::new(transport), Arc::new(ImageUrlCache::new()), logger))
    }

    /// Replaces the retry policy derived from the configuration.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ImageUrlCache> {
        &self.cache
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn article_url(&self, id: &str) -> String {
        format!("{}{}?{}={}", self.config.capi_path, id, API_KEY_PARAM, self.config.api_key)
    }

    fn search_url(&self) -> StrictResult<Url> {
        Ok(Url::parse_with_params(
            &self.config.sapi_path,
            &[(API_KEY_PARAM, self.config.api_key.as_str())],
        )?)
    }

    fn concordance_url(&self, tme_id: &str) -> StrictResult<Url> {
        Ok(Url::parse_with_params(
            &self.config.concordances_path,
            &[
                ("identifierValue", tme_id),
                ("authority", self.config.tme_authority.as_str()),
                (API_KEY_PARAM, self.config.api_key.as_str()),
            ],
        )?)
    }

    fn v2_url(&self, api_url: &str) -> StrictResult<Url> {
        let mut url = Url::parse(api_url)?;
        url.query_pairs_mut().append_pair(API_KEY_PARAM, &self.config.api_key);
        Ok(url)
    }

    /// Resilient fetch through this API's transport and retry policy.
    pub async fn fetch_with_retry(&self, address: &str, options: &RequestOptions) -> StrictResult<TransportResponse> {
        resilient::fetch_with_retry(self.transport.as_ref(), address, options, &self.retry, &self.logger).await
    }

    /// Enriched content of one article, parsed.
    ///
    /// Single-shot unless `article_retry` is configured.
    pub async fn get_article(&self, id: &str) -> StrictResult<Value> {
        let url = self.article_url(id);
        let options = RequestOptions::get();
        self.logger.debug(&format!("get_article: id={}", id), None).await;

        let text = if self.config.article_retry {
            self.fetch_with_retry(&url, &options).await?.body
        } else {
            fetch_text(self.transport.as_ref(), &url, &options).await?
        };

        serde_json::from_str(&text).map_err(|e| ContentError::parse(&e, &text, format!("id={}", id)))
    }

    /// The article's main image URL, cached per identifier.
    ///
    /// A cached `None` is returned without touching the network. Errors are
    /// propagated and never cached.
    pub async fn get_article_image_url(&self, id: &str) -> StrictResult<Option<String>> {
        if let Some(image_url) = self.cache.get(id) {
            self.logger
                .debug(&format!("get_article_image_url: id={}: cache hit: image_url={:?}", id, image_url), None)
                .await;
            return Ok(image_url);
        }

        let article = self.get_article(id).await?;
        let image_url = match probe_image_url(&article) {
            Ok(url) => {
                self.logger
                    .debug(&format!("get_article_image_url: id={}: cache miss: image_url={}", id, url), None)
                    .await;
                Some(url)
            }
            Err(reason) => {
                self.logger
                    .debug(&format!("get_article_image_url: id={}: {}", id, reason), None)
                    .await;
                None
            }
        };

        Ok(self.cache.insert_if_absent(id, image_url))
    }

    async fn search_strict(&self, params: &SearchParams) -> StrictResult<Value> {
        let query = build_query(params);
        let url = self.search_url()?;
        let options = RequestOptions::post_json(&query)?;

        self.logger
            .debug(
                "search: built query",
                Some(json!({"query": query, "url": mask_api_key(url.as_str())})),
            )
            .await;

        let text = fetch_text(self.transport.as_ref(), url.as_str(), &options).await?;
        serde_json::from_str(&text).map_err(|e| {
            let params = serde_json::to_string(params).unwrap_or_else(|_| format!("{:?}", params));
            ContentError::parse(&e, &text, params)
        })
    }

    /// Runs a search. Never fails: on any error the result carries `params`
    /// only and the error is logged.
    pub async fn search(&self, params: SearchParams) -> SearchResult {
        match self.search_strict(&params).await {
            Ok(sapi_obj) => SearchResult {
                params,
                sapi_obj: Some(sapi_obj),
            },
            Err(e) => {
                self.logger
                    .error(&format!("search: err={}", e), Some(json!({"params": params})))
                    .await;
                SearchResult::failed(params)
            }
        }
    }

    pub async fn search_by_identifier(&self, id: &str) -> SearchResult {
        self.search(SearchParams::query(id)).await
    }

    /// Searches for content last published strictly between the two epoch
    /// bounds, on top of whatever `params` already constrains.
    pub async fn search_time_range(&self, after_secs: i64, before_secs: i64, mut params: SearchParams) -> SearchResult {
        let bounds = unix_time_to_iso(after_secs).and_then(|after| Ok((after, unix_time_to_iso(before_secs)?)));
        let (after, before) = match bounds {
            Ok(bounds) => bounds,
            Err(e) => {
                self.logger
                    .error(&format!("search_time_range: err={}", e), Some(json!({"params": params})))
                    .await;
                return SearchResult::failed(params);
            }
        };

        params.constraints.get_or_insert_with(Vec::new).extend([
            format!("lastPublishDateTime:>{}", after),
            format!("lastPublishDateTime:<{}", before),
        ]);

        self.search(params).await
    }

    /// Searches for `taxonomy:value`, faceting on the taxonomy.
    pub async fn search_by_entity_with_facets(&self, entity: &str) -> SearchResult {
        let ontology = entity.split_once(':').map(|(taxonomy, _)| taxonomy).unwrap_or(entity);
        self.search(SearchParams::query(entity).with_ontology(ontology)).await
    }

    async fn fetch_json(&self, operation: &str, url: StrictResult<Url>) -> StrictResult<Value> {
        let url = url?;
        let masked = mask_api_key(url.as_str());
        self.logger.debug(&format!("{}: url={}", operation, masked), None).await;

        let text = fetch_text(self.transport.as_ref(), url.as_str(), &RequestOptions::get()).await?;
        serde_json::from_str(&text).map_err(|e| ContentError::parse(&e, &text, masked))
    }

    async fn fetch_json_lenient(&self, operation: &str, url: StrictResult<Url>) -> LenientResult<Value> {
        match self.fetch_json(operation, url).await {
            Ok(value) => Some(value),
            Err(e) => {
                self.logger.error(&format!("{}: err={}", operation, e), None).await;
                None
            }
        }
    }

    /// Concordance record mapping a legacy TME identifier to its modern form.
    pub async fn resolve_legacy_identifier(&self, tme_id: &str) -> LenientResult<Value> {
        let url = self.concordance_url(tme_id);
        self.fetch_json_lenient("resolve_legacy_identifier", url).await
    }

    /// Fetches an arbitrary API URL with the key appended.
    pub async fn call_v2(&self, api_url: &str) -> LenientResult<Value> {
        let url = self.v2_url(api_url);
        self.fetch_json_lenient("call_v2", url).await
    }

    /// Summary of every transport call made through this API.
    pub fn summarise_fetch_timings(&self, history: Option<usize>) -> TimingsSummary {
        self.timings.summarise(history)
    }
}
