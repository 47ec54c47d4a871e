//! Retry policy for collection fetches.
//!
//! Expresses the retry decision as an explicit verdict consumed by a small
//! loop in the client, instead of nested control flow around each request.
//!
//! Rate-limit and transient-server statuses (429/502/503/504) honor a
//! server-provided `Retry-After` delay, floored by exponential backoff.
//! Network-level errors back off exponentially. Exhausting the budget is a
//! terminal fetch failure, never an empty collection.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// What the fetch loop should do after one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The response is usable.
    Proceed,
    /// Transient failure; wait this long, then try again.
    RetryAfter(Duration),
    /// Non-retryable failure, or retry budget exhausted.
    GiveUp,
}

/// Bounded retry policy for one logical fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether a status is worth retrying at all.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }

    /// Classify an HTTP response status.
    ///
    /// `attempt` is 1-based: the number of the attempt that just completed.
    pub fn on_status(
        &self,
        status: StatusCode,
        retry_after: Option<Duration>,
        attempt: u32,
    ) -> Verdict {
        if status.is_success() {
            return Verdict::Proceed;
        }
        if !Self::is_retryable_status(status) || attempt > self.max_retries {
            return Verdict::GiveUp;
        }
        let floor = backoff(attempt);
        Verdict::RetryAfter(retry_after.unwrap_or(floor).max(floor))
    }

    /// Classify a network-level error (timeout, connection reset).
    pub fn on_error(&self, attempt: u32) -> Verdict {
        if attempt > self.max_retries {
            Verdict::GiveUp
        } else {
            Verdict::RetryAfter(backoff(attempt))
        }
    }
}

/// Exponential backoff: 2^attempt seconds, capped at 64s.
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// Parse an integer-seconds `Retry-After` header, if present.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
