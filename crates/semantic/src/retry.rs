//! Retry logic with exponential backoff for embedding API calls.
//!
//! Only transport-level failures are retried. Callers decide which errors are
//! transient through [`is_retryable_error`].

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Initial delay between retries (base for exponential backoff) in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Maximum delay between retries in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Add random jitter to prevent thundering herd.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
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

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate delay before a specific retry attempt (attempt 0 is the first try).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        // base_delay * multiplier^(attempt-1), capped at max_delay
        let exponential =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        if self.jitter {
            let jitter_range = delay_ms / 4;
            if jitter_range > 0 {
                let jitter = fastrand::u64(0..jitter_range * 2);
                return Duration::from_millis(delay_ms.saturating_sub(jitter_range) + jitter);
            }
        }

        Duration::from_millis(delay_ms)
    }
}

/// Result of a retryable operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    /// The final result (success or last error).
    pub result: Result<T, String>,
    /// Number of attempts made (1 = first try succeeded).
    pub attempts: u32,
    pub total_duration: Duration,
}

impl<T> RetryResult<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, String> {
        self.result
    }
}

/// Execute an async operation, retrying while it fails with a retryable error.
///
/// # Example
/// ```
/// use semantic::retry::{execute_with_retry_async, RetryConfig};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = RetryConfig::default()
///     .with_max_retries(3)
///     .with_base_delay(Duration::from_millis(1));
///
/// let result = execute_with_retry_async(&config, |attempt| async move {
///     if attempt == 0 {
///         Err("connection reset".to_string())
///     } else {
///         Ok("success")
///     }
/// })
/// .await;
///
/// assert!(result.is_success());
/// assert_eq!(result.attempts, 2);
/// # }
/// ```
pub async fn execute_with_retry_async<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, String>>,
{
    let start = Instant::now();
    let mut last_error = None;
    let mut attempts = 0;

    for attempt in 0..=config.max_retries {
        attempts = attempt + 1;
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_duration: start.elapsed(),
                };
            }
            Err(e) => {
                let retryable = is_retryable_error(&e);
                last_error = Some(e);
                if !retryable {
                    break;
                }
                if attempt < config.max_retries {
                    let delay = config.calculate_delay(attempt + 1);
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "embedding_retry");
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    RetryResult {
        result: Err(last_error.unwrap_or_else(|| "all retries exhausted".to_string())),
        attempts,
        total_duration: start.elapsed(),
    }
}

/// Determine if an error is retryable based on transport hints and HTTP status codes.
pub fn is_retryable_error(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("reset")
        || error_lower.contains("refused")
        || error_lower.contains("dns")
        || error_lower.contains("unreachable")
    {
        return true;
    }

    // 5xx and 429
    if ["500", "502", "503", "504", "524", "429"]
        .iter()
        .any(|code| error_lower.contains(code))
    {
        return true;
    }

    // 4xx client errors and malformed payloads never heal on their own
    if ["400", "401", "403", "404", "422"]
        .iter()
        .any(|code| error_lower.contains(code))
        || error_lower.contains("invalid json")
        || error_lower.contains("unsupported api response")
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay, Duration::from_millis(200));
        assert_eq!(config.max_delay, Duration::from_secs(5));
        assert!(config.jitter);
    }

    #[test]
    fn test_calculate_delay_exponential_without_jitter() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(false);
        assert_eq!(config.calculate_delay(0), Duration::ZERO);
        assert_eq!(config.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(config.calculate_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_calculate_delay_caps_at_max() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(2))
            .with_jitter(false);
        assert_eq!(config.calculate_delay(10), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let config = RetryConfig::default().with_base_delay(Duration::from_millis(400));
        for _ in 0..50 {
            let delay = config.calculate_delay(1).as_millis();
            assert!((300..500).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("HTTP error 503 Service Unavailable"));
        assert!(is_retryable_error("connection refused"));
        assert!(is_retryable_error("HTTP error 429 Too Many Requests"));
        assert!(!is_retryable_error("HTTP error 401 Unauthorized"));
        assert!(!is_retryable_error("Invalid JSON response: eof"));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default().with_base_delay(Duration::from_millis(1));
        let result: RetryResult<()> = execute_with_retry_async(&config, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("HTTP error 401 Unauthorized".to_string()) }
        })
        .await;
        assert!(!result.is_success());
        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retryable_error_exhausts_budget() {
        let config = RetryConfig::default()
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(1));
        let result: RetryResult<()> =
            execute_with_retry_async(&config, |_| async { Err("timeout".to_string()) }).await;
        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result(), Err("timeout".to_string()));
    }
}
