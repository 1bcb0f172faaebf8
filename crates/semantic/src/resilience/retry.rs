//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

/// Backoff policy for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Spread each delay by up to ±25%.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (1-based); attempt 0 never waits.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        if self.jitter {
            let spread = delay_ms / 4;
            if spread > 0 {
                let offset = fastrand::u64(0..spread * 2);
                return Duration::from_millis(delay_ms - spread + offset);
            }
        }

        Duration::from_millis(delay_ms)
    }
}

/// Outcome of [`execute_with_retry_async`].
#[derive(Debug)]
pub struct RetryResult<T, E> {
    pub result: Result<T, E>,
    /// Attempts made, `1` when the first try settled it.
    pub attempts: u32,
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation` until it succeeds, `retryable` rejects the error, or the
/// retry budget is spent. The closure receives the 0-based attempt number.
pub async fn execute_with_retry_async<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    retryable: P,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                }
            }
            Err(err) => {
                if attempt >= config.max_retries || !retryable(&err) {
                    return RetryResult {
                        result: Err(err),
                        attempts: attempt + 1,
                        total_duration: start.elapsed(),
                    };
                }
                attempt += 1;
                let delay = config.calculate_delay(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Classify an error message: transport trouble, 5xx and 429 are worth
/// another try; other 4xx are not. Unknown messages retry.
pub fn is_retryable_error(error: &str) -> bool {
    let lower = error.to_ascii_lowercase();

    const TRANSIENT: [&str; 6] = ["timeout", "timed out", "connection", "reset", "refused", "dns"];
    if TRANSIENT.iter().any(|needle| lower.contains(needle)) {
        return true;
    }

    const RETRY_STATUS: [&str; 6] = ["500", "502", "503", "504", "524", "429"];
    if RETRY_STATUS.iter().any(|code| lower.contains(code)) {
        return true;
    }

    const FATAL_STATUS: [&str; 5] = ["400", "401", "403", "404", "422"];
    !FATAL_STATUS.iter().any(|code| lower.contains(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_jitter(false);
        assert_eq!(cfg.calculate_delay(0), Duration::ZERO);
        assert_eq!(cfg.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(cfg.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(cfg.calculate_delay(3), Duration::from_millis(300));
        assert_eq!(cfg.calculate_delay(9), Duration::from_millis(300));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let cfg = RetryConfig::default().with_base_delay(Duration::from_millis(400));
        for _ in 0..50 {
            let d = cfg.calculate_delay(1).as_millis();
            assert!((300..500).contains(&d), "delay {d}ms out of range");
        }
    }

    #[tokio::test]
    async fn eventual_success_counts_attempts() {
        let calls = AtomicU32::new(0);
        let out = execute_with_retry_async(
            &quick(),
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("503 busy".to_string())
                    } else {
                        Ok("done")
                    }
                }
            },
            |e: &String| is_retryable_error(e),
        )
        .await;
        assert!(out.succeeded());
        assert_eq!(out.attempts, 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let out: RetryResult<(), String> = execute_with_retry_async(
            &quick(),
            |_| async { Err("HTTP 401 Unauthorized".to_string()) },
            |e: &String| is_retryable_error(e),
        )
        .await;
        assert_eq!(out.attempts, 1);
        assert!(!out.succeeded());
    }

    #[tokio::test]
    async fn budget_is_max_retries_plus_one() {
        let cfg = quick().with_max_retries(2);
        let out: RetryResult<(), &str> =
            execute_with_retry_async(&cfg, |_| async { Err("timeout") }, |_| true).await;
        assert_eq!(out.attempts, 3);
        assert_eq!(out.into_result(), Err("timeout"));
    }

    #[test]
    fn classifies_status_codes() {
        assert!(is_retryable_error("connection reset by peer"));
        assert!(is_retryable_error("HTTP error 503 Service Unavailable"));
        assert!(is_retryable_error("429 Too Many Requests"));
        assert!(!is_retryable_error("HTTP error 400 Bad Request"));
        assert!(!is_retryable_error("404 Not Found"));
    }

    #[test]
    fn config_reads_millis() {
        let cfg: RetryConfig =
            serde_json::from_str(r#"{"max_retries":1,"base_delay":250}"#).unwrap();
        assert_eq!(cfg.max_retries, 1);
        assert_eq!(cfg.base_delay, Duration::from_millis(250));
        assert_eq!(cfg.max_delay, Duration::from_secs(5));
    }
}
