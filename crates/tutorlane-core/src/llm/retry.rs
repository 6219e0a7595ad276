//! Bounded retry with exponential backoff around breaker-protected calls.
//!
//! Only transient provider failures are retried. The handler never returns
//! an error to its caller: exhaustion or a permanent failure is reported as
//! `used_fallback = true` with the last error attached.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tutorlane_types::config::RetryConfig;
use tutorlane_types::llm::LlmError;

/// Backoff schedule for one call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    ///
    /// `base * 2^(attempt-1)`, capped at `max_delay`. With jitter the delay
    /// is drawn uniformly from the upper half of that value.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let raw = self.base_delay.saturating_mul(1 << exponent);
        let capped = raw.min(self.max_delay);
        if !self.jitter {
            return capped;
        }
        let millis = capped.as_millis() as u64;
        let half = millis / 2;
        let jittered = half + rand::thread_rng().gen_range(0..=millis - half);
        Duration::from_millis(jittered)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// What happened across all attempts of one call.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Option<T>,
    pub used_fallback: bool,
    /// Attempts made after the first one.
    pub retry_count: u32,
    pub error: Option<LlmError>,
}

impl<T> RetryOutcome<T> {
    fn success(value: T, retry_count: u32) -> Self {
        Self {
            result: Some(value),
            used_fallback: false,
            retry_count,
            error: None,
        }
    }

    fn failed(error: LlmError, retry_count: u32) -> Self {
        Self {
            result: None,
            used_fallback: error != LlmError::Cancelled,
            retry_count,
            error: Some(error),
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.error == Some(LlmError::Cancelled)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryHandler {
    policy: RetryPolicy,
}

impl RetryHandler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. `operation` receives the 1-based attempt number.
    ///
    /// Backoff sleeps end early with [`LlmError::Cancelled`] when `cancel`
    /// fires.
    pub async fn retry<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;
        loop {
            let retries = attempt - 1;
            if cancel.is_cancelled() {
                return RetryOutcome::failed(LlmError::Cancelled, retries);
            }

            let error = match operation(attempt).await {
                Ok(value) => return RetryOutcome::success(value, retries),
                Err(error) => error,
            };

            if !error.is_transient() {
                if error.is_permanent() {
                    tracing::warn!(attempt, error = %error, "permanent provider failure, not retrying");
                }
                return RetryOutcome::failed(error, retries);
            }
            if attempt >= max_attempts {
                tracing::warn!(attempt, error = %error, "retry budget exhausted");
                return RetryOutcome::failed(error, retries);
            }

            let mut delay = self.policy.delay_for(attempt);
            if let LlmError::RateLimited {
                retry_after_ms: Some(hint),
            } = &error
            {
                delay = delay.max(Duration::from_millis(*hint).min(self.policy.max_delay));
            }
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient provider failure, backing off"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return RetryOutcome::failed(LlmError::Cancelled, retries);
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
