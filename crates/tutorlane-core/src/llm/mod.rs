//! Provider abstraction and the resilience layer around it.

pub mod box_provider;
pub mod breaker;
pub mod provider;
pub mod retry;

pub use box_provider::BoxLlmProvider;
pub use breaker::{CircuitBreaker, CircuitState};
pub use provider::LlmProvider;
pub use retry::{RetryHandler, RetryOutcome, RetryPolicy};
