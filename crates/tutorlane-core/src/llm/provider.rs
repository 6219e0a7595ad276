//! LlmProvider trait definition.
//!
//! The tutor only needs one-shot completions: the model returns a JSON
//! lesson plan which the pipeline turns into a short spoken utterance.

use tutorlane_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for remote (or scripted) model backends.
///
/// Uses native async fn in traits (RPITIT). Implementations live in
/// tutorlane-infra (`OpenAiCompatibleProvider`, `ScriptedProvider`); use
/// [`super::BoxLlmProvider`] where the concrete type is chosen at runtime.
///
/// Implementations classify their failures through [`LlmError`]; the
/// retry handler and breaker rely on `is_transient` / `is_permanent`.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai-compatible", "scripted").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
