//! Connection settings for an OpenAI-compatible endpoint.

use std::time::Duration;

use secrecy::SecretString;
use tutorlane_types::config::ProviderConfig;

/// Everything [`super::OpenAiCompatibleProvider`] needs to talk to an endpoint.
///
/// Does not derive Debug so the key can't leak through logs.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name used in logs and metrics.
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    /// Transport-level timeout; the pipeline applies its own per-call timeout too.
    pub timeout: Duration,
}

impl OpenAiCompatConfig {
    pub fn from_provider_config(config: &ProviderConfig, api_key: SecretString) -> Self {
        Self {
            provider_name: provider_name_for(&config.base_url).to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Best-effort label for well-known hosts.
fn provider_name_for(base_url: &str) -> &'static str {
    if base_url.contains("api.openai.com") {
        "openai"
    } else if base_url.contains("generativelanguage.googleapis.com") {
        "gemini"
    } else if base_url.contains("api.mistral.ai") {
        "mistral"
    } else if base_url.contains("localhost") || base_url.contains("127.0.0.1") {
        "local"
    } else {
        "openai-compatible"
    }
}
