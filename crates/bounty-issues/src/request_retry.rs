//! Replay rules for the bot's outbound HTTP calls.
//!
//! Reads (comment listings, issue and repository lookups) may be sent again
//! after any transient failure. Creates (report comments, marketplace tasks)
//! produce server-side state, so they are sent again only when the request
//! provably never reached the server.

use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_BACKOFF_DOUBLINGS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a request failed before a response arrived.
pub enum TransportFailure {
    /// No connection was established.
    NotConnected,
    /// Sent, then timed out waiting for the response.
    TimedOut,
    /// Failed while sending or reading; the server may have processed it.
    Interrupted,
    Other,
}

impl TransportFailure {
    pub fn classify(error: &reqwest::Error) -> Self {
        if error.is_connect() {
            Self::NotConnected
        } else if error.is_timeout() {
            Self::TimedOut
        } else if error.is_request() || error.is_body() {
            Self::Interrupted
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: usize,
    base_delay: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms.max(1)),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// `attempt` is 1-based and names the attempt that just got `status`.
    pub fn should_retry_status(&self, kind: RequestKind, attempt: usize, status: u16) -> bool {
        if attempt >= self.max_attempts || kind == RequestKind::Create {
            return false;
        }
        status == 429 || (500..600).contains(&status)
    }

    pub fn should_retry_failure(
        &self,
        kind: RequestKind,
        attempt: usize,
        failure: TransportFailure,
    ) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match (kind, failure) {
            (_, TransportFailure::NotConnected) => true,
            (RequestKind::Read, TransportFailure::TimedOut | TransportFailure::Interrupted) => true,
            _ => false,
        }
    }

    /// Delay before the attempt after `attempt`. A server hint wins but never
    /// undercuts the base delay.
    pub fn backoff(&self, attempt: usize, server_hint: Option<Duration>) -> Duration {
        if let Some(hint) = server_hint {
            return hint.max(self.base_delay);
        }
        let doublings = u32::try_from(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX)
            .min(MAX_BACKOFF_DOUBLINGS);
        self.base_delay
            .saturating_mul(1_u32 << doublings)
            .min(MAX_BACKOFF)
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
pub fn retry_after_hint(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Cuts `text` to `max_chars` characters, marking the cut with `...`.
pub fn clip_error_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::{
        clip_error_text, retry_after_hint, RequestKind, RetryBudget, TransportFailure,
    };

    #[test]
    fn unit_reads_retry_rate_limits_and_server_errors_within_budget() {
        let budget = RetryBudget::new(3, 10);
        assert!(budget.should_retry_status(RequestKind::Read, 1, 429));
        assert!(budget.should_retry_status(RequestKind::Read, 2, 502));
        assert!(!budget.should_retry_status(RequestKind::Read, 3, 502));
        assert!(!budget.should_retry_status(RequestKind::Read, 1, 404));
        assert!(!budget.should_retry_status(RequestKind::Read, 1, 422));
    }

    #[test]
    fn regression_creates_are_never_replayed_after_a_server_response() {
        let budget = RetryBudget::new(4, 10);
        for status in [429_u16, 500, 502, 503] {
            assert!(!budget.should_retry_status(RequestKind::Create, 1, status));
        }
    }

    #[test]
    fn regression_creates_retry_only_when_the_connection_never_opened() {
        let budget = RetryBudget::new(4, 10);
        assert!(budget.should_retry_failure(
            RequestKind::Create,
            1,
            TransportFailure::NotConnected
        ));
        assert!(!budget.should_retry_failure(RequestKind::Create, 1, TransportFailure::TimedOut));
        assert!(!budget.should_retry_failure(
            RequestKind::Create,
            1,
            TransportFailure::Interrupted
        ));
        assert!(budget.should_retry_failure(RequestKind::Read, 1, TransportFailure::TimedOut));
        assert!(!budget.should_retry_failure(RequestKind::Read, 1, TransportFailure::Other));
        assert!(!budget.should_retry_failure(
            RequestKind::Read,
            4,
            TransportFailure::NotConnected
        ));
    }

    #[test]
    fn unit_budget_clamps_zero_configuration() {
        let budget = RetryBudget::new(0, 0);
        assert_eq!(budget.max_attempts(), 1);
        assert_eq!(budget.backoff(1, None), Duration::from_millis(1));
    }

    #[test]
    fn unit_backoff_doubles_and_caps() {
        let budget = RetryBudget::new(5, 100);
        assert_eq!(budget.backoff(1, None), Duration::from_millis(100));
        assert_eq!(budget.backoff(3, None), Duration::from_millis(400));
        assert_eq!(budget.backoff(40, None), Duration::from_secs(30));
        assert_eq!(
            RetryBudget::new(2, 20_000).backoff(2, None),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn unit_backoff_prefers_server_hint_above_base_delay() {
        let budget = RetryBudget::new(3, 250);
        assert_eq!(
            budget.backoff(1, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            budget.backoff(1, Some(Duration::from_millis(10))),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn unit_retry_after_hint_reads_delta_seconds_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_hint(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(7)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after_hint(&headers), None);
    }

    #[test]
    fn regression_clip_error_text_cuts_on_char_boundaries() {
        assert_eq!(clip_error_text("é🌊xyz", 2), "é🌊...");
        assert_eq!(clip_error_text("short", 5), "short");
        assert_eq!(clip_error_text("", 3), "");
    }
}
