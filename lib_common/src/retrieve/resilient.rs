//! # Resilient Fetcher
//!
//! Issues a request, classifies the outcome and tries again until either an
//! acceptable response arrives or the attempt ceiling of the [`RetryPolicy`] is
//! reached. Transport errors and non-success statuses are treated alike: both
//! are logged and retried. Running out of attempts is the only fatal outcome.
//!
//! Attempts are sequential. By default there is no delay between them; a
//! [`Backoff`] can be supplied to change that.

use std::time::{Duration, SystemTime};

use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{RetryDecision, RetryPolicy as _};
use serde_json::json;

use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::error::ContentError;
use crate::retrieve::mask_api_key;
use crate::retrieve::transport::{RequestOptions, Transport, TransportResponse};

/// Hard attempt ceiling used unless configured otherwise.
pub const MAX_ATTEMPTS: u32 = 5;

/// Delay strategy between two attempts of the same logical fetch.
#[derive(Debug, Clone, Default)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Wait the same duration before every retry.
    Fixed(Duration),
    /// Exponential delays with jitter, bounded by the policy's retry bounds.
    Exponential(ExponentialBackoff),
}

impl Backoff {
    /// Exponential backoff between `min` and `max`.
    ///
    /// The number of attempts is governed by [`RetryPolicy::max_attempts`], so
    /// the inner policy is never allowed to give up on its own.
    pub fn exponential(min: Duration, max: Duration) -> Self {
        Backoff::Exponential(
            ExponentialBackoff::builder()
                .retry_bounds(min, max)
                .build_with_max_retries(u32::MAX),
        )
    }

    /// How long to wait after `past_attempts` failed attempts.
    pub fn delay(&self, started: SystemTime, past_attempts: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential(policy) => match policy.should_retry(started, past_attempts) {
                RetryDecision::Retry { execute_after } => execute_after
                    .duration_since(SystemTime::now())
                    .unwrap_or(Duration::ZERO),
                RetryDecision::DoNotRetry => Duration::ZERO,
            },
        }
    }
}

/// Attempt budget and delay strategy for one logical fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self { max_attempts, backoff }
    }

    /// Immediate retries, `max_attempts` in total.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }
}

/// Fetches `address` until a 2xx response arrives or the policy runs out.
///
/// Resolves with the first acceptable response. Every rejected attempt is
/// logged with its zero-based attempt number and the serialized options.
///
/// # Errors
/// [`ContentError::RetriesExhausted`] once `policy.max_attempts` attempts have
/// been made without an acceptable response.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    address: &str,
    options: &RequestOptions,
    policy: &RetryPolicy,
    logger: &LoggerLocal,
) -> Result<TransportResponse, ContentError> {
    let started = SystemTime::now();
    let masked = mask_api_key(address);

    for attempt in 0..policy.max_attempts {
        let reason = match transport.send(address, options).await {
            Ok(res) if res.ok() => return Ok(res),
            Ok(res) => format!("response not ok: status={} {}", res.status, res.status_text),
            Err(e) => format!("transport failed: {}", e),
        };

        logger
            .error(
                &format!(
                    "fetch_with_retry: {}: attempt={}, options={}",
                    reason,
                    attempt,
                    options.to_json_string()
                ),
                Some(json!({"url": masked, "attempt": attempt, "max_attempts": policy.max_attempts})),
            )
            .await;

        if attempt + 1 < policy.max_attempts {
            let delay = policy.backoff.delay(started, attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(ContentError::RetriesExhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loggers::loggerlocal::LoggerLocalOptions;
    use crate::retrieve::test_support::ScriptedTransport;

    fn quiet_logger() -> LoggerLocal {
        LoggerLocal::new("resilient_test".to_string(), Some(LoggerLocalOptions::tracing_only()))
    }

    #[tokio::test]
    async fn test_four_failures_then_success_resolves_with_fifth_response() {
        let transport = ScriptedTransport::new(vec![
            Err(ContentError::Transport("connection reset".into())),
            Ok(TransportResponse::new(500, "")),
            Ok(TransportResponse::new(503, "")),
            Err(ContentError::Transport("timed out".into())),
            Ok(TransportResponse::new(200, "fifth")),
        ]);

        let res = fetch_with_retry(&transport, "http://api/x", &RequestOptions::get(), &RetryPolicy::default(), &quiet_logger())
            .await
            .expect("fifth attempt is within budget");

        assert_eq!(res.body, "fifth");
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test]
    async fn test_never_succeeding_transport_rejects_after_exactly_five_attempts() {
        let transport = ScriptedTransport::repeating(Ok(TransportResponse::new(500, "nope")));

        let err = fetch_with_retry(&transport, "http://api/x", &RequestOptions::get(), &RetryPolicy::default(), &quiet_logger())
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::RetriesExhausted { attempts: 5 }));
        assert!(err.to_string().contains("exhausted retries after 5 attempts"));
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test]
    async fn test_first_success_makes_a_single_call() {
        let transport = ScriptedTransport::repeating(Ok(TransportResponse::new(200, "{}")));

        fetch_with_retry(&transport, "http://api/x", &RequestOptions::get(), &RetryPolicy::default(), &quiet_logger())
            .await
            .unwrap();

        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_attempt_ceiling_is_honoured() {
        let transport = ScriptedTransport::repeating(Err(ContentError::Transport("down".into())));
        let policy = RetryPolicy::new(2, Backoff::Fixed(Duration::from_millis(1)));

        let err = fetch_with_retry(&transport, "http://api/x", &RequestOptions::get(), &policy, &quiet_logger())
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::RetriesExhausted { attempts: 2 }));
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn test_backoff_delays() {
        let now = SystemTime::now();
        assert_eq!(Backoff::None.delay(now, 3), Duration::ZERO);
        assert_eq!(Backoff::Fixed(Duration::from_millis(250)).delay(now, 0), Duration::from_millis(250));

        let exp = Backoff::exponential(Duration::from_millis(10), Duration::from_millis(100));
        assert!(exp.delay(now, 4) <= Duration::from_millis(100));
    }
}
