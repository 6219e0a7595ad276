//! Deterministic offline provider.
//!
//! Builds a [`TutorPlan`] from the system prompt and the student's message
//! without any network access, so the whole pipeline can run in demos and
//! local sessions. The same input always yields the same plan.

use tutorlane_core::llm::LlmProvider;
use tutorlane_types::llm::{CompletionRequest, CompletionResponse, LlmError, TutorPlan, Usage};

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider;

impl ScriptedProvider {
    pub fn new() -> Self {
        Self
    }

    fn plan_for(request: &CompletionRequest) -> TutorPlan {
        let seed: usize = request.user_message.bytes().map(usize::from).sum();
        let a = seed % 9 + 1;
        let b = (seed / 9) % 9 + 1;
        let practice = format!("What is {a} plus {b}?");
        let title = lesson_title(&request.system);

        let opening = if request.system.contains("answered correctly") {
            "Nice work, that's right.".to_string()
        } else if request.system.contains("answered incorrectly") {
            "Good try, let's count it out together.".to_string()
        } else {
            match title {
                Some(title) => format!("Let's keep practicing {title}."),
                None => "Let's practice together.".to_string(),
            }
        };

        TutorPlan {
            goal: title.map_or_else(|| "practice".to_string(), |t| format!("practice {t}")),
            plan_steps: vec![opening.clone(), practice.clone()],
            next_prompt: format!("{opening} {practice}"),
            followup_options: vec!["Want another one?".to_string()],
        }
    }
}

/// The `Title:` line of the prompt's lesson section, if any.
fn lesson_title(system: &str) -> Option<&str> {
    system
        .lines()
        .find_map(|line| line.strip_prefix("Title: "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
}

fn estimate_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let plan = Self::plan_for(request);
        let content = serde_json::to_string(&plan)
            .map_err(|e| LlmError::Deserialization(format!("failed to encode plan: {e}")))?;

        Ok(CompletionResponse {
            usage: Usage {
                input_tokens: estimate_tokens(&request.system) + estimate_tokens(&request.user_message),
                output_tokens: estimate_tokens(&plan.next_prompt),
            },
            content,
            model: "scripted-1".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: &str, message: &str) -> CompletionRequest {
        CompletionRequest {
            system: system.to_string(),
            user_message: message.to_string(),
            max_tokens: 100,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn scripted_reply_is_a_parseable_plan() {
        let provider = ScriptedProvider::new();
        let response = provider
            .complete(&request("<lesson>\nSubject: math\nTitle: Adding small numbers\n</lesson>", "hello"))
            .await
            .unwrap();

        let plan = TutorPlan::from_model_output(&response.content);
        assert!(plan.next_prompt.starts_with("Let's keep practicing Adding small numbers."));
        assert!(plan.next_prompt.ends_with('?'));
        assert!(response.usage.total() > 0);
    }

    #[tokio::test]
    async fn scripted_reply_is_deterministic() {
        let provider = ScriptedProvider::new();
        let first = provider.complete(&request("", "ten")).await.unwrap();
        let second = provider.complete(&request("", "ten")).await.unwrap();
        assert_eq!(first.content, second.content);
    }

    #[test]
    fn verdict_changes_the_opening() {
        let plan = ScriptedProvider::plan_for(&request(
            "<previous_question>\nThe student answered correctly. Praise briefly.\n</previous_question>",
            "12",
        ));
        assert!(plan.next_prompt.starts_with("Nice work"));
    }
}
