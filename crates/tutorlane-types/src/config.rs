//! Configuration types for tutorlane.
//!
//! `TutorConfig` represents the top-level `config.toml`. Every section and
//! field has a default so an empty file (or no file) yields a working setup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::gate::{GateThresholds, GatingProfile};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorConfig {
    #[serde(default)]
    pub gating: GatingConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub lessons: LessonsConfig,
}

/// Input gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingConfig {
    #[serde(default)]
    pub profile: GatingProfile,
    /// Overrides the profile's duration threshold when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration_ms: Option<u64>,
    /// Overrides the profile's confidence threshold when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(default = "default_recent_input_window")]
    pub recent_input_window: usize,
}

impl GatingConfig {
    /// Effective thresholds: the profile preset with explicit overrides applied.
    pub fn thresholds(&self) -> GateThresholds {
        let preset = self.profile.thresholds();
        GateThresholds {
            min_duration_ms: self.min_duration_ms.unwrap_or(preset.min_duration_ms),
            min_confidence: self.min_confidence.unwrap_or(preset.min_confidence),
        }
    }
}

fn default_recent_input_window() -> usize {
    5
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            profile: GatingProfile::default(),
            min_duration_ms: None,
            min_confidence: None,
            recent_input_window: default_recent_input_window(),
        }
    }
}

/// Circuit breaker settings for the LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    #[serde(default = "default_open_duration_ms")]
    pub open_duration_ms: u64,
    #[serde(default = "default_half_open_max_trials")]
    pub half_open_max_trials: u32,
    /// Rolling window for the error-rate trip condition.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,
    /// Calls needed inside the window before the error rate is considered.
    #[serde(default = "default_min_calls_in_window")]
    pub min_calls_in_window: u32,
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_success_threshold() -> u32 {
    2
}
fn default_open_duration_ms() -> u64 {
    30_000
}
fn default_half_open_max_trials() -> u32 {
    1
}
fn default_window_ms() -> u64 {
    60_000
}
fn default_error_rate_threshold() -> f64 {
    0.5
}
fn default_min_calls_in_window() -> u32 {
    10
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            open_duration_ms: default_open_duration_ms(),
            half_open_max_trials: default_half_open_max_trials(),
            window_ms: default_window_ms(),
            error_rate_threshold: default_error_rate_threshold(),
            min_calls_in_window: default_min_calls_in_window(),
        }
    }
}

/// Retry/backoff settings for provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    2_000
}
fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Entries older than this are treated as misses. `0` disables expiry.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> usize {
    500
}
fn default_cache_ttl_secs() -> u64 {
    3_600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Session lane and per-session state lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    #[serde(default = "default_true")]
    pub allow_barge_in: bool,
}

fn default_idle_timeout_secs() -> u64 {
    1_800
}
fn default_purge_interval_secs() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            purge_interval_secs: default_purge_interval_secs(),
            allow_barge_in: true,
        }
    }
}

/// Telemetry ring-buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Recording is off unless this is set.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_telemetry_capacity")]
    pub capacity: usize,
    /// Optional JSON-lines file that receives every recorded entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_path: Option<String>,
}

fn default_telemetry_capacity() -> usize {
    50
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            debug: false,
            capacity: default_telemetry_capacity(),
            sink_path: None,
        }
    }
}

/// Which LLM backend the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    #[default]
    OpenaiCompatible,
    /// Deterministic local provider for demos and offline runs.
    Scripted,
    /// No provider: every cache miss takes the fallback path.
    Disabled,
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderMode::OpenaiCompatible => write!(f, "openai_compatible"),
            ProviderMode::Scripted => write!(f, "scripted"),
            ProviderMode::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for ProviderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai_compatible" | "openai" | "remote" => Ok(ProviderMode::OpenaiCompatible),
            "scripted" | "mock" => Ok(ProviderMode::Scripted),
            "disabled" | "off" | "none" => Ok(ProviderMode::Disabled),
            other => Err(format!("invalid provider mode: '{other}'")),
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub mode: ProviderMode,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key_env() -> String {
    "TUTORLANE_API_KEY".to_string()
}
fn default_timeout_ms() -> u64 {
    8_000
}
fn default_max_tokens() -> u32 {
    300
}
fn default_temperature() -> f64 {
    0.4
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Where lesson context is loaded from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonsConfig {
    /// A JSON file or a directory of JSON files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: TutorConfig = toml::from_str("").unwrap();
        assert_eq!(config.gating.profile, GatingProfile::Conservative);
        assert_eq!(config.gating.recent_input_window, 5);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.cache.capacity, 500);
        assert_eq!(config.telemetry.capacity, 50);
        assert!(!config.telemetry.debug);
        assert!(config.session.allow_barge_in);
        assert_eq!(config.provider.mode, ProviderMode::OpenaiCompatible);
    }

    #[test]
    fn explicit_thresholds_override_profile() {
        let config: TutorConfig = toml::from_str(
            r#"
[gating]
profile = "responsive"
min_confidence = 0.42
"#,
        )
        .unwrap();
        let t = config.gating.thresholds();
        assert_eq!(t.min_duration_ms, 150);
        assert!((t.min_confidence - 0.42).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let config: TutorConfig = toml::from_str(
            r#"
[breaker]
failure_threshold = 2

[provider]
mode = "scripted"
"#,
        )
        .unwrap();
        assert_eq!(config.breaker.failure_threshold, 2);
        assert_eq!(config.breaker.open_duration_ms, 30_000);
        assert_eq!(config.provider.mode, ProviderMode::Scripted);
        assert_eq!(config.provider.timeout_ms, 8_000);
    }

    #[test]
    fn provider_mode_aliases() {
        assert_eq!("mock".parse::<ProviderMode>().unwrap(), ProviderMode::Scripted);
        assert_eq!("off".parse::<ProviderMode>().unwrap(), ProviderMode::Disabled);
        assert!("bogus".parse::<ProviderMode>().is_err());
    }
}
