//! Retry logic with exponential backoff and jitter.
//!
//! Used by the AI backends for task submission and status polling. The
//! workflow engine itself never retries; a failed generation is final.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::core::config::ApiConfig;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,

    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 = double each time).
    pub backoff_multiplier: f64,

    /// Whether to add up to 25% jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Retry policy for task API requests.
    pub fn from_api(api: &ApiConfig) -> Self {
        Self { max_attempts: api.max_retries, ..Default::default() }
    }

    /// Calculate delay for the given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let delay = if self.jitter { capped * (1.0 + jitter_fraction() * 0.25) } else { capped };

        Duration::from_millis(delay as u64)
    }

    /// Delay before the next attempt, honoring a server-requested wait up to
    /// `max_delay`.
    fn delay_for(&self, action: RetryAction, attempt: u32) -> Duration {
        match action {
            RetryAction::After(wait) => wait.min(self.max_delay),
            RetryAction::Backoff | RetryAction::Stop => self.delay_for_attempt(attempt),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Return the error.
    Stop,
    /// Retry after the exponential backoff delay.
    Backoff,
    /// Retry after the delay the server asked for.
    After(Duration),
}

/// Pseudo-random value in `[0, 1)` taken from the clock.
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,

    /// Number of attempts made.
    pub attempts: u32,

    /// Total time spent (including delays).
    pub total_time: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Whether more than one attempt was needed.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Retry an async operation; `on_error` decides whether and when.
pub async fn retry_async<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    on_error: P,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> RetryAction,
{
    let start = Instant::now();
    let max_attempts = config.max_attempts + 1;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = operation().await;

        let action = match &result {
            Ok(_) => RetryAction::Stop,
            Err(_) if attempts >= max_attempts => RetryAction::Stop,
            Err(e) => on_error(e),
        };

        if action == RetryAction::Stop {
            return RetryResult { result, attempts, total_time: start.elapsed() };
        }

        let delay = config.delay_for(action, attempts);
        tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Retrying");
        tokio::time::sleep(delay).await;
    }
}
