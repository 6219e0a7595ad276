//! Circuit breaker guarding the LLM provider.
//!
//! One breaker instance is shared by every session lane. All state lives
//! behind a single mutex and every transition goes through
//! [`BreakerInner::transition`], so concurrent callers never lose updates.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tutorlane_types::breaker::BreakerStatus;
use tutorlane_types::config::BreakerConfig;
use tutorlane_types::llm::LlmError;

/// Circuit breaker state.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    /// Normal operation. Tracks consecutive failures toward the threshold.
    Closed { consecutive_failures: u32 },
    /// Calls fail fast until `wait_duration` has elapsed.
    Open {
        opened_at: Instant,
        wait_duration: Duration,
    },
    /// A limited number of trial calls probe whether the provider recovered.
    HalfOpen { trials_in_flight: u32, successes: u32 },
}

impl CircuitState {
    fn closed() -> Self {
        CircuitState::Closed {
            consecutive_failures: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CircuitState::Closed { .. } => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen { .. } => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    last_transition: Instant,
    /// `(finished_at, failed)` for calls inside the tracking window.
    window: VecDeque<(Instant, bool)>,
    total_calls: u64,
    total_failures: u64,
    last_error: Option<String>,
}

impl BreakerInner {
    fn transition(&mut self, next: CircuitState) {
        let from = self.state.label();
        let to = next.label();
        if from != to {
            match &next {
                CircuitState::Open { .. } => {
                    tracing::warn!(from, to, last_error = ?self.last_error, "circuit breaker opened");
                }
                CircuitState::Closed { .. } => tracing::info!(from, to, "circuit breaker closed"),
                CircuitState::HalfOpen { .. } => tracing::info!(from, to, "circuit breaker probing"),
            }
            self.last_transition = Instant::now();
            self.window.clear();
        }
        self.state = next;
    }

    /// Move Open -> HalfOpen once the cool-down has elapsed.
    fn refresh(&mut self) {
        if let CircuitState::Open {
            opened_at,
            wait_duration,
        } = self.state
        {
            if opened_at.elapsed() >= wait_duration {
                self.transition(CircuitState::HalfOpen {
                    trials_in_flight: 0,
                    successes: 0,
                });
            }
        }
    }

    fn prune_window(&mut self, window: Duration) {
        let now = Instant::now();
        while let Some((at, _)) = self.window.front() {
            if now.duration_since(*at) > window {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }
}

/// What the permit holder reports back when its call finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    /// Cancelled or dropped before completion; not a provider fault.
    Abandoned,
}

/// Admission ticket for one protected call.
///
/// Dropping an unsettled permit (e.g. the caller's future was cancelled)
/// releases its half-open trial slot without counting a failure.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, outcome: Outcome, error: Option<&LlmError>) {
        self.settled = true;
        self.breaker.settle(outcome, error);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(Outcome::Abandoned, None);
        }
    }
}

/// Shared circuit breaker for the provider dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    success_threshold: u32,
    open_duration: Duration,
    half_open_max_trials: u32,
    window: Duration,
    error_rate_threshold: f64,
    min_calls_in_window: u32,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            open_duration: Duration::from_millis(config.open_duration_ms),
            half_open_max_trials: config.half_open_max_trials.max(1),
            window: Duration::from_millis(config.window_ms),
            error_rate_threshold: config.error_rate_threshold,
            min_calls_in_window: config.min_calls_in_window,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::closed(),
                last_transition: Instant::now(),
                window: VecDeque::new(),
                total_calls: 0,
                total_failures: 0,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker lock poisoned")
    }

    /// Whether a call made now would fail fast.
    pub fn is_open(&self) -> bool {
        let mut inner = self.lock();
        inner.refresh();
        match inner.state {
            CircuitState::Closed { .. } => false,
            CircuitState::Open { .. } => true,
            CircuitState::HalfOpen {
                trials_in_flight, ..
            } => trials_in_flight >= self.half_open_max_trials,
        }
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        inner.refresh();
        inner.state.clone()
    }

    fn acquire(&self) -> Result<Permit<'_>, LlmError> {
        let mut inner = self.lock();
        inner.refresh();
        match inner.state {
            CircuitState::Closed { .. } => {}
            CircuitState::Open { .. } => return Err(LlmError::CircuitOpen),
            CircuitState::HalfOpen {
                trials_in_flight,
                successes,
            } => {
                if trials_in_flight >= self.half_open_max_trials {
                    return Err(LlmError::CircuitOpen);
                }
                inner.state = CircuitState::HalfOpen {
                    trials_in_flight: trials_in_flight + 1,
                    successes,
                };
            }
        }
        Ok(Permit {
            breaker: self,
            settled: false,
        })
    }

    /// Run `operation` under the breaker.
    ///
    /// When the circuit is open the operation is not invoked and
    /// [`LlmError::CircuitOpen`] is returned.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, LlmError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let permit = self.acquire()?;
        let result = operation().await;
        match &result {
            Ok(_) => permit.settle(Outcome::Success, None),
            Err(LlmError::Cancelled) => permit.settle(Outcome::Abandoned, None),
            Err(error) => permit.settle(Outcome::Failure, Some(error)),
        }
        result
    }

    fn settle(&self, outcome: Outcome, error: Option<&LlmError>) {
        let mut inner = self.lock();
        if let CircuitState::HalfOpen {
            trials_in_flight,
            successes,
        } = inner.state
        {
            inner.state = CircuitState::HalfOpen {
                trials_in_flight: trials_in_flight.saturating_sub(1),
                successes,
            };
        }

        if outcome == Outcome::Abandoned {
            return;
        }

        inner.total_calls += 1;
        let failed = outcome == Outcome::Failure;
        if failed {
            inner.total_failures += 1;
            inner.last_error = error.map(ToString::to_string);
        }

        match inner.state.clone() {
            CircuitState::Closed {
                consecutive_failures,
            } => {
                if !failed {
                    inner.state = CircuitState::closed();
                    inner.window.push_back((Instant::now(), false));
                    inner.prune_window(self.window);
                    return;
                }
                let count = consecutive_failures + 1;
                inner.window.push_back((Instant::now(), true));
                inner.prune_window(self.window);
                let permanent = error.is_some_and(LlmError::is_permanent);
                if permanent || count >= self.failure_threshold || self.rate_tripped(&inner) {
                    inner.transition(self.open_state());
                } else {
                    inner.state = CircuitState::Closed {
                        consecutive_failures: count,
                    };
                }
            }
            CircuitState::HalfOpen {
                trials_in_flight,
                successes,
            } => {
                if failed {
                    inner.transition(self.open_state());
                } else if successes + 1 >= self.success_threshold {
                    inner.transition(CircuitState::closed());
                } else {
                    inner.state = CircuitState::HalfOpen {
                        trials_in_flight,
                        successes: successes + 1,
                    };
                }
            }
            // A call admitted before the circuit opened; only totals change.
            CircuitState::Open { .. } => {}
        }
    }

    fn rate_tripped(&self, inner: &BreakerInner) -> bool {
        let calls = inner.window.len() as u32;
        if self.min_calls_in_window == 0 || calls < self.min_calls_in_window {
            return false;
        }
        let failures = inner.window.iter().filter(|(_, failed)| *failed).count();
        failures as f64 / calls as f64 >= self.error_rate_threshold
    }

    fn open_state(&self) -> CircuitState {
        CircuitState::Open {
            opened_at: Instant::now(),
            wait_duration: self.open_duration,
        }
    }

    pub fn status(&self) -> BreakerStatus {
        let mut inner = self.lock();
        inner.refresh();
        let (consecutive_failures, half_open_trials) = match inner.state {
            CircuitState::Closed {
                consecutive_failures,
            } => (consecutive_failures, 0),
            CircuitState::Open { .. } => (0, 0),
            CircuitState::HalfOpen {
                trials_in_flight, ..
            } => (0, trials_in_flight),
        };
        BreakerStatus {
            state: inner.state.label().to_string(),
            consecutive_failures,
            half_open_trials,
            seconds_since_transition: inner.last_transition.elapsed().as_secs(),
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            last_error: inner.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            open_duration_ms: 1_000,
            half_open_max_trials: 1,
            window_ms: 60_000,
            error_rate_threshold: 0.5,
            min_calls_in_window: 0,
        }
    }

    fn transient() -> LlmError {
        LlmError::Timeout { after_ms: 100 }
    }

    async fn fail(breaker: &CircuitBreaker, error: LlmError) {
        let _ = breaker.execute(|| async move { Err::<(), _>(error) }).await;
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<(), LlmError> {
        breaker.execute(|| async { Ok(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(&config());
        fail(&breaker, transient()).await;
        fail(&breaker, transient()).await;
        assert!(!breaker.is_open());
        fail(&breaker, transient()).await;
        assert!(breaker.is_open());
        assert_eq!(breaker.status().state, "open");
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_does_not_invoke_operation() {
        let breaker = CircuitBreaker::new(&config());
        for _ in 0..3 {
            fail(&breaker, transient()).await;
        }
        let calls = AtomicU32::new(0);
        let result = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(result, Err(LlmError::CircuitOpen));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_consecutive_count() {
        let breaker = CircuitBreaker::new(&config());
        fail(&breaker, transient()).await;
        fail(&breaker, transient()).await;
        succeed(&breaker).await.unwrap();
        fail(&breaker, transient()).await;
        assert!(!breaker.is_open());
        assert_eq!(breaker.status().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_closes_after_success_threshold() {
        let breaker = CircuitBreaker::new(&config());
        for _ in 0..3 {
            fail(&breaker, transient()).await;
        }
        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert!(!breaker.is_open());
        assert_eq!(breaker.state().label(), "half_open");

        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state().label(), "half_open");
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::closed());
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_trial_failure_reopens() {
        let breaker = CircuitBreaker::new(&config());
        for _ in 0..3 {
            fail(&breaker, transient()).await;
        }
        tokio::time::advance(Duration::from_millis(1_001)).await;
        fail(&breaker, transient()).await;
        assert!(breaker.is_open());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(breaker.is_open(), "cool-down restarts on reopen");
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_limits_concurrent_trials() {
        let breaker = CircuitBreaker::new(&config());
        for _ in 0..3 {
            fail(&breaker, transient()).await;
        }
        tokio::time::advance(Duration::from_millis(1_001)).await;

        let permit = breaker.acquire().unwrap();
        assert!(breaker.is_open());
        assert_eq!(breaker.acquire().err(), Some(LlmError::CircuitOpen));
        drop(permit);
        assert!(!breaker.is_open(), "dropped trial frees its slot");
        assert_eq!(breaker.status().total_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_trips_immediately() {
        let breaker = CircuitBreaker::new(&config());
        fail(&breaker, LlmError::AuthenticationFailed).await;
        assert!(breaker.is_open());
        assert!(breaker.status().last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_not_a_failure() {
        let breaker = CircuitBreaker::new(&config());
        for _ in 0..5 {
            fail(&breaker, LlmError::Cancelled).await;
        }
        assert!(!breaker.is_open());
        assert_eq!(breaker.status().total_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn error_rate_trips_within_window() {
        let breaker = CircuitBreaker::new(&BreakerConfig {
            failure_threshold: 100,
            min_calls_in_window: 4,
            ..config()
        });
        succeed(&breaker).await.unwrap();
        fail(&breaker, transient()).await;
        succeed(&breaker).await.unwrap();
        assert!(!breaker.is_open());
        fail(&breaker, transient()).await;
        assert!(breaker.is_open(), "2 of 4 calls failed");
    }

    #[tokio::test(start_paused = true)]
    async fn old_outcomes_leave_the_window() {
        let breaker = CircuitBreaker::new(&BreakerConfig {
            failure_threshold: 100,
            min_calls_in_window: 4,
            window_ms: 1_000,
            ..config()
        });
        fail(&breaker, transient()).await;
        fail(&breaker, transient()).await;
        tokio::time::advance(Duration::from_millis(1_500)).await;
        succeed(&breaker).await.unwrap();
        succeed(&breaker).await.unwrap();
        succeed(&breaker).await.unwrap();
        fail(&breaker, transient()).await;
        assert!(!breaker.is_open(), "1 of 4 calls failed in window");
    }
}
