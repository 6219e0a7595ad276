//! Turn telemetry records and their aggregate summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lesson::Subject;

/// One recorded turn outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEntry {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    pub subject: Subject,
    pub input: String,
    pub output: String,
    pub used_fallback: bool,
    pub used_cache: bool,
    pub retry_count: u32,
    pub latency_ms: u64,
    pub tokens_used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregates over the telemetry buffer window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySummary {
    pub total_turns: usize,
    pub fallback_count: usize,
    pub cache_hit_count: usize,
    pub gated_count: usize,
    pub error_count: usize,
    pub fallback_rate: f64,
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
    pub avg_retries: f64,
    pub total_tokens: u64,
}
