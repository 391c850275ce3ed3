//! Retry schedule for advisory calls.
//!
//! Advice is only useful while the snapshot it describes is current, so the
//! schedule caps both the number of retries and the total wall time one call
//! may spend waiting between attempts.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use rescue_core::next_backoff_ms_with_jitter;

pub const BASE_BACKOFF_MS: u64 = 200;

/// Rate limiting, transient conflicts and upstream failures are retried;
/// other 4xx answers mean the request itself is wrong.
pub fn should_retry_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429 | 500..=599)
}

/// `Retry-After` as milliseconds: delta-seconds or an HTTP date. Dates in the
/// past read as zero.
pub fn parse_retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<u64>() {
        Ok(seconds) => Some(seconds.saturating_mul(1_000)),
        Err(_) => {
            let at = DateTime::parse_from_rfc2822(value).ok()?;
            let remaining = at.with_timezone(&Utc) - Utc::now();
            Some(u64::try_from(remaining.num_milliseconds()).unwrap_or(0))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    pub max_retries: usize,
    pub jitter: bool,
    /// Wall-time budget for the whole call in milliseconds; 0 is unbounded.
    pub budget_ms: u64,
}

impl RetrySchedule {
    /// Wait before the retry that follows `attempt`, or `None` when retries
    /// are exhausted or the wait would overrun the budget. A `Retry-After`
    /// hint raises the wait, never lowers it.
    pub fn next_delay_ms(
        &self,
        attempt: usize,
        elapsed_ms: u64,
        retry_after_ms: Option<u64>,
    ) -> Option<u64> {
        if attempt >= self.max_retries {
            return None;
        }
        let backoff_ms = next_backoff_ms_with_jitter(BASE_BACKOFF_MS, attempt, self.jitter);
        let delay_ms = retry_after_ms.map_or(backoff_ms, |hint| hint.max(backoff_ms));
        let overruns = self.budget_ms > 0 && elapsed_ms.saturating_add(delay_ms) > self.budget_ms;
        (!overruns).then_some(delay_ms)
    }
}

/// Transport failures worth retrying. Timeouts are excluded: the per-attempt
/// timeout already consumed most of the budget.
pub(crate) fn is_retryable_http_error(error: &reqwest::Error) -> bool {
    !error.is_timeout() && (error.is_connect() || error.is_request() || error.is_body())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::{parse_retry_after_ms, should_retry_status, RetrySchedule};

    fn schedule(max_retries: usize, budget_ms: u64) -> RetrySchedule {
        RetrySchedule {
            max_retries,
            jitter: false,
            budget_ms,
        }
    }

    #[test]
    fn advisory_statuses_split_into_retryable_and_final() {
        for status in [408, 409, 425, 429, 500, 502, 503, 504] {
            assert!(should_retry_status(status), "{status} should retry");
        }
        for status in [200, 400, 401, 403, 404, 422] {
            assert!(!should_retry_status(status), "{status} should not retry");
        }
    }

    #[test]
    fn retry_after_reads_seconds_dates_and_rejects_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after_ms(&headers), Some(7_000));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("after lunch"));
        assert_eq!(parse_retry_after_ms(&headers), None);

        let past = (Utc::now() - Duration::seconds(30))
            .to_rfc2822()
            .replace("+0000", "GMT");
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_str(&past).expect("header value"),
        );
        assert_eq!(parse_retry_after_ms(&headers), Some(0));

        let future = (Utc::now() + Duration::seconds(3))
            .to_rfc2822()
            .replace("+0000", "GMT");
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_str(&future).expect("header value"),
        );
        let delay = parse_retry_after_ms(&headers).expect("future date");
        assert!((1_000..=3_500).contains(&delay), "got {delay}");
    }

    #[test]
    fn schedule_doubles_until_retries_run_out() {
        let schedule = schedule(2, 0);
        assert_eq!(schedule.next_delay_ms(0, 0, None), Some(200));
        assert_eq!(schedule.next_delay_ms(1, 0, None), Some(400));
        assert_eq!(schedule.next_delay_ms(2, 0, None), None);
        assert_eq!(RetrySchedule { max_retries: 0, ..schedule }.next_delay_ms(0, 0, None), None);
    }

    #[test]
    fn retry_after_hint_only_extends_the_wait() {
        let schedule = schedule(3, 0);
        assert_eq!(schedule.next_delay_ms(2, 0, Some(100)), Some(800));
        assert_eq!(schedule.next_delay_ms(0, 0, Some(1_500)), Some(1_500));
    }

    #[test]
    fn waits_that_overrun_the_call_budget_give_up() {
        let schedule = schedule(3, 1_000);
        assert_eq!(schedule.next_delay_ms(0, 0, None), Some(200));
        assert_eq!(schedule.next_delay_ms(0, 800, None), Some(200));
        assert_eq!(schedule.next_delay_ms(0, 801, None), None);
        assert_eq!(schedule.next_delay_ms(0, 0, Some(30_000)), None);
        assert_eq!(
            RetrySchedule { budget_ms: 0, ..schedule }.next_delay_ms(0, 0, Some(30_000)),
            Some(30_000)
        );
    }
}
