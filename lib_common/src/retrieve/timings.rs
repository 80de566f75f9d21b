//! # Fetch Timings
//!
//! Bookkeeping for the operators' "summary of fetches" view: every call that
//! goes through a [`TimedTransport`] is recorded with its duration and outcome
//! in a bounded ring of recent records.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::retrieve::error::ContentError;
use crate::retrieve::mask_api_key;
use crate::retrieve::transport::{HttpMethod, RequestOptions, Transport, TransportResponse};

/// Default number of records kept.
pub const DEFAULT_TIMINGS_CAPACITY: usize = 1000;

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTiming {
    pub method: HttpMethod,
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub ok: bool,
    pub status: Option<u16>,
}

/// Aggregate view over the recorded calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingsSummary {
    pub count: usize,
    pub successes: usize,
    pub failures: usize,
    pub mean_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent: Vec<FetchTiming>,
}

/// Bounded, shareable store of [`FetchTiming`] records.
#[derive(Debug)]
pub struct FetchTimings {
    records: Mutex<VecDeque<FetchTiming>>,
    capacity: usize,
}

impl Default for FetchTimings {
    fn default() -> Self {
        Self::new(DEFAULT_TIMINGS_CAPACITY)
    }
}

impl FetchTimings {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_TIMINGS_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Appends a record, dropping the oldest once the ring is full.
    pub fn record(&self, timing: FetchTiming) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(timing);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summarises everything recorded so far. With `history`, the last
    /// `history` records are included newest first.
    pub fn summarise(&self, history: Option<usize>) -> TimingsSummary {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.is_empty() {
            return TimingsSummary::default();
        }

        let count = records.len();
        let successes = records.iter().filter(|t| t.ok).count();
        let total: u64 = records.iter().map(|t| t.duration_ms).sum();
        let min_ms = records.iter().map(|t| t.duration_ms).min().unwrap_or(0);
        let max_ms = records.iter().map(|t| t.duration_ms).max().unwrap_or(0);
        let recent = history
            .map(|n| records.iter().rev().take(n).cloned().collect())
            .unwrap_or_default();

        TimingsSummary {
            count,
            successes,
            failures: count - successes,
            mean_ms: total as f64 / count as f64,
            min_ms,
            max_ms,
            recent,
        }
    }
}

/// A [`Transport`] decorator that records every call into [`FetchTimings`].
pub struct TimedTransport {
    inner: Arc<dyn Transport>,
    timings: Arc<FetchTimings>,
}

impl TimedTransport {
    pub fn new(inner: Arc<dyn Transport>, timings: Arc<FetchTimings>) -> Self {
        Self { inner, timings }
    }
}

#[async_trait]
impl Transport for TimedTransport {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<TransportResponse, ContentError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let result = self.inner.send(url, options).await;

        let (ok, status) = match &result {
            Ok(res) => (res.ok(), Some(res.status)),
            Err(_) => (false, None),
        };
        self.timings.record(FetchTiming {
            method: options.method,
            url: mask_api_key(url),
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            ok,
            status,
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::test_support::ScriptedTransport;

    fn timing(ms: u64, ok: bool) -> FetchTiming {
        FetchTiming {
            method: HttpMethod::Get,
            url: format!("http://api/{}", ms),
            started_at: Utc::now(),
            duration_ms: ms,
            ok,
            status: Some(if ok { 200 } else { 500 }),
        }
    }

    #[test]
    fn test_summary_aggregates_and_limits_history() {
        let timings = FetchTimings::new(10);
        timings.record(timing(10, true));
        timings.record(timing(30, false));
        timings.record(timing(20, true));

        let summary = timings.summarise(Some(2));
        assert_eq!(summary.count, 3);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.min_ms, 10);
        assert_eq!(summary.max_ms, 30);
        assert!((summary.mean_ms - 20.0).abs() < f64::EPSILON);
        assert_eq!(summary.recent.len(), 2);
        assert_eq!(summary.recent[0].duration_ms, 20);
    }

    #[test]
    fn test_ring_drops_oldest() {
        let timings = FetchTimings::new(2);
        timings.record(timing(1, true));
        timings.record(timing(2, true));
        timings.record(timing(3, true));
        assert_eq!(timings.len(), 2);
        assert_eq!(timings.summarise(None).min_ms, 2);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(FetchTimings::default().summarise(Some(5)), TimingsSummary::default());
    }

    #[tokio::test]
    async fn test_timed_transport_records_masked_calls() {
        let inner: Arc<dyn Transport> = Arc::new(ScriptedTransport::repeating(Ok(TransportResponse::new(503, ""))));
        let timings = Arc::new(FetchTimings::default());
        let timed = TimedTransport::new(inner, timings.clone());

        let res = timed.send("http://api/x?apiKey=k", &RequestOptions::get()).await.unwrap();
        assert_eq!(res.status, 503);

        let summary = timings.summarise(Some(1));
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.recent[0].url, "http://api/x?apiKey=*****");
        assert_eq!(summary.recent[0].status, Some(503));
    }
}
