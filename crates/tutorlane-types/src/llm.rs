//! LLM request/response types and the provider error taxonomy.

use serde::{Deserialize, Serialize};

/// Request to an LLM provider: one system prompt and one student message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user_message: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Raw response from an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Unparsed model text (expected to hold a [`TutorPlan`] JSON object).
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// Structured tutoring plan the model is asked to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorPlan {
    #[serde(default)]
    pub goal: String,
    #[serde(default, alias = "plan_steps")]
    pub plan_steps: Vec<String>,
    #[serde(default, alias = "next_prompt")]
    pub next_prompt: String,
    #[serde(default, alias = "followup_options")]
    pub followup_options: Vec<String>,
}

impl TutorPlan {
    /// Parse a plan out of raw model text.
    ///
    /// Accepts a bare JSON object or one embedded in prose / code fences
    /// (the outermost `{...}` slice is tried). Text that holds no usable
    /// object becomes the `next_prompt` verbatim.
    pub fn from_model_output(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(plan) = serde_json::from_str::<TutorPlan>(trimmed) {
            if !plan.is_empty() {
                return plan;
            }
        }

        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                if let Ok(plan) = serde_json::from_str::<TutorPlan>(&trimmed[start..=end]) {
                    if !plan.is_empty() {
                        return plan;
                    }
                }
            }
        }

        TutorPlan {
            next_prompt: trimmed.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.goal.trim().is_empty()
            && self.next_prompt.trim().is_empty()
            && self.plan_steps.iter().all(|s| s.trim().is_empty())
    }
}

/// Errors from LLM provider operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("provider call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("call cancelled")]
    Cancelled,
}

impl LlmError {
    /// Failures worth retrying: timeouts, rate limits, overload, connection
    /// drops, and generic provider-side (5xx) errors.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Provider { .. }
                | LlmError::Timeout { .. }
                | LlmError::Connection(..)
                | LlmError::RateLimited { .. }
                | LlmError::Overloaded(..)
        )
    }

    /// Auth/config failures that retrying cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationFailed
                | LlmError::InvalidRequest(..)
                | LlmError::Deserialization(..)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parses_camel_case_json() {
        let raw = r#"{"goal":"add","planSteps":["count"],"nextPrompt":"What is 2 + 3?","followupOptions":["5"]}"#;
        let plan = TutorPlan::from_model_output(raw);
        assert_eq!(plan.next_prompt, "What is 2 + 3?");
        assert_eq!(plan.plan_steps, vec!["count".to_string()]);
    }

    #[test]
    fn plan_parses_snake_case_inside_fence() {
        let raw = "Sure!\n```json\n{\"goal\":\"g\",\"next_prompt\":\"Ready?\"}\n```";
        let plan = TutorPlan::from_model_output(raw);
        assert_eq!(plan.goal, "g");
        assert_eq!(plan.next_prompt, "Ready?");
    }

    #[test]
    fn plain_text_becomes_next_prompt() {
        let plan = TutorPlan::from_model_output("  Let's count apples. How many? ");
        assert_eq!(plan.next_prompt, "Let's count apples. How many?");
        assert!(plan.plan_steps.is_empty());
    }

    #[test]
    fn empty_object_falls_back_to_raw_text() {
        let plan = TutorPlan::from_model_output("{}");
        assert_eq!(plan.next_prompt, "{}");
    }

    #[test]
    fn error_classification() {
        assert!(LlmError::Timeout { after_ms: 10 }.is_transient());
        assert!(LlmError::RateLimited { retry_after_ms: None }.is_transient());
        assert!(LlmError::Connection("reset".into()).is_transient());
        assert!(!LlmError::AuthenticationFailed.is_transient());
        assert!(LlmError::AuthenticationFailed.is_permanent());
        assert!(LlmError::InvalidRequest("bad".into()).is_permanent());
        assert!(!LlmError::CircuitOpen.is_transient());
        assert!(!LlmError::CircuitOpen.is_permanent());
        assert!(!LlmError::Cancelled.is_transient());
    }

    #[test]
    fn usage_total_saturates() {
        let usage = Usage {
            input_tokens: u32::MAX,
            output_tokens: 5,
        };
        assert_eq!(usage.total(), u32::MAX);
    }
}
