//! OpenAI-compatible LLM provider.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI, Gemini, Mistral and
//! local OpenAI-style servers through a configurable base URL. Requests go
//! to `POST {base_url}/chat/completions` with JSON-object output enabled.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed when
//! building the `Authorization` header.

pub mod config;
pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tutorlane_core::llm::LlmProvider;
use tutorlane_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use self::config::OpenAiCompatConfig;
use self::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};

pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    provider_name: String,
    base_url: String,
    api_key: SecretString,
    model: String,
    timeout: Duration,
}

// No Debug: the key lives in this struct.

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider_name: config.provider_name,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: request.system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.user_message.clone(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: ResponseFormat::json_object(),
        }
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else if error.is_connect() {
            LlmError::Connection(error.to_string())
        } else {
            LlmError::Provider {
                message: format!("HTTP request failed: {error}"),
            }
        }
    }
}

/// Map a non-success HTTP status to the provider error taxonomy.
pub(crate) fn map_status(status: u16, retry_after: Option<&str>, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        400 | 404 | 422 => LlmError::InvalidRequest(body),
        429 => LlmError::RateLimited {
            retry_after_ms: retry_after.and_then(parse_retry_after),
        },
        503 | 529 => LlmError::Overloaded(body),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// `Retry-After` in (possibly fractional) seconds, as milliseconds.
fn parse_retry_after(value: &str) -> Option<u64> {
    let seconds: f64 = value.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| (seconds * 1000.0) as u64)
}

pub(crate) fn into_completion(response: ChatResponse) -> Result<CompletionResponse, LlmError> {
    let content = response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| LlmError::Deserialization("response has no message content".to_string()))?;
    let usage = response.usage.unwrap_or_default();

    Ok(CompletionResponse {
        content,
        model: response.model,
        usage: Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        },
    })
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), retry_after.as_deref(), error_body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;
        let completion = into_completion(parsed)?;

        tracing::debug!(
            provider = %self.provider_name,
            model = %completion.model,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "completion received"
        );
        Ok(completion)
    }
}
