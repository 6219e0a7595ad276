//! LLM provider implementations.
//!
//! Concrete implementations of the [`LlmProvider`](tutorlane_core::llm::LlmProvider)
//! trait defined in `tutorlane-core`, plus a factory ([`create_provider`])
//! that picks one from [`ProviderConfig`].

pub mod openai_compat;
pub mod scripted;

use secrecy::SecretString;

use tutorlane_core::llm::{BoxLlmProvider, LlmProvider};
use tutorlane_types::config::{ProviderConfig, ProviderMode};
use tutorlane_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;
use self::scripted::ScriptedProvider;

/// Build the provider selected by `config.mode`.
///
/// Returns `Ok(None)` for [`ProviderMode::Disabled`]. `api_key` is the
/// already-resolved value of `config.api_key_env`.
///
/// # Errors
///
/// [`LlmError::AuthenticationFailed`] when the OpenAI-compatible mode has no key.
pub fn create_provider(
    config: &ProviderConfig,
    api_key: Option<&str>,
) -> Result<Option<BoxLlmProvider>, LlmError> {
    match config.mode {
        ProviderMode::Disabled => {
            tracing::info!("provider disabled, turns will use practice fallbacks");
            Ok(None)
        }
        ProviderMode::Scripted => Ok(Some(BoxLlmProvider::new(ScriptedProvider::new()))),
        ProviderMode::OpenaiCompatible => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or(LlmError::AuthenticationFailed)?;
            let oai_config =
                OpenAiCompatConfig::from_provider_config(config, SecretString::from(key.to_string()));
            let provider = OpenAiCompatibleProvider::new(oai_config)?;
            tracing::info!(provider = provider.name(), model = %provider.model(), "provider ready");
            Ok(Some(BoxLlmProvider::new(provider)))
        }
    }
}

/// Resolve the API key from the environment variable named in `config`.
pub fn resolve_api_key(config: &ProviderConfig) -> Option<String> {
    std::env::var(&config.api_key_env).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_mode_builds_nothing() {
        let config = ProviderConfig {
            mode: ProviderMode::Disabled,
            ..Default::default()
        };
        assert!(create_provider(&config, None).unwrap().is_none());
    }

    #[test]
    fn scripted_mode_needs_no_key() {
        let config = ProviderConfig {
            mode: ProviderMode::Scripted,
            ..Default::default()
        };
        let provider = create_provider(&config, None).unwrap().unwrap();
        assert_eq!(provider.name(), "scripted");
    }

    #[test]
    fn remote_mode_requires_key() {
        let config = ProviderConfig::default();
        assert!(matches!(
            create_provider(&config, None),
            Err(LlmError::AuthenticationFailed)
        ));
        assert!(matches!(
            create_provider(&config, Some("  ")),
            Err(LlmError::AuthenticationFailed)
        ));
        let provider = create_provider(&config, Some("sk-test")).unwrap().unwrap();
        assert_eq!(provider.name(), "openai");
    }
}
