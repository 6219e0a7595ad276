//! Circuit breaker status snapshot for CLI/HTTP display.

use serde::{Deserialize, Serialize};

/// Point-in-time view of the provider circuit breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStatus {
    /// "closed", "open" or "half_open".
    pub state: String,
    pub consecutive_failures: u32,
    pub half_open_trials: u32,
    pub seconds_since_transition: u64,
    pub total_calls: u64,
    pub total_failures: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
