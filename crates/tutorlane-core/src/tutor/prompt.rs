//! System prompt builder for the tutor.
//!
//! Sections use XML tags so the model can tell lesson facts, the previous
//! question's verdict and the house rules apart:
//!
//! ```text
//! <lesson>Subject / Title / Objectives / Key terms</lesson>
//! <previous_question>question, expected answer, verdict</previous_question>
//! <recent_responses>things already said (do not repeat)</recent_responses>
//! <rules>voice-only tutoring rules</rules>
//! <output_format>JSON plan schema</output_format>
//! ```

use tutorlane_types::answer::{AnswerCheck, PendingQuestion};
use tutorlane_types::lesson::LessonContext;

/// A pending question together with the verdict on the student's reply.
#[derive(Debug, Clone, Copy)]
pub struct PendingVerdict<'a> {
    pub question: &'a PendingQuestion,
    pub check: &'a AnswerCheck,
}

pub struct TutorPromptBuilder;

impl TutorPromptBuilder {
    pub fn build(
        lesson: Option<&LessonContext>,
        pending: Option<PendingVerdict<'_>>,
        recent_responses: &[String],
    ) -> String {
        let mut sections = Vec::with_capacity(5);

        if let Some(lesson) = lesson {
            sections.push(Self::lesson_section(lesson));
        }

        if let Some(verdict) = pending {
            sections.push(Self::previous_question_section(verdict));
        }

        if !recent_responses.is_empty() {
            let lines: Vec<String> = recent_responses.iter().map(|r| format!("- {r}")).collect();
            sections.push(format!(
                "<recent_responses>\n\
                You already said the following. Do not repeat them:\n\
                {}\n\
                </recent_responses>",
                lines.join("\n")
            ));
        }

        sections.push(
            "<rules>\n\
            You are a patient, encouraging voice tutor for a young student.\n\
            The student only hears you: never refer to pictures, screens, boards or anything to look at.\n\
            Never ask the student to move, stand, raise a hand or do any physical action.\n\
            Speak in at most two short sentences and always end with one question.\n\
            Stay on the lesson topic and build on the student's last answer.\n\
            </rules>"
                .to_string(),
        );

        sections.push(
            "<output_format>\n\
            Reply with a single JSON object and nothing else:\n\
            {\"goal\": string, \"planSteps\": [string], \"nextPrompt\": string, \"followupOptions\": [string]}\n\
            nextPrompt is exactly what you will say aloud.\n\
            </output_format>"
                .to_string(),
        );

        sections.join("\n\n")
    }

    fn lesson_section(lesson: &LessonContext) -> String {
        let mut lines = vec![
            format!("Subject: {}", lesson.subject),
            format!("Title: {}", lesson.title),
        ];
        if !lesson.objectives.is_empty() {
            lines.push("Objectives:".to_string());
            lines.extend(lesson.objectives.iter().map(|o| format!("- {o}")));
        }
        if !lesson.key_terms.is_empty() {
            lines.push(format!("Key terms: {}", lesson.key_terms.join(", ")));
        }
        format!("<lesson>\n{}\n</lesson>", lines.join("\n"))
    }

    fn previous_question_section(verdict: PendingVerdict<'_>) -> String {
        let outcome = if verdict.check.is_correct {
            "The student answered correctly. Praise briefly, then move on.".to_string()
        } else {
            let mut line = "The student answered incorrectly. Gently correct them.".to_string();
            if let Some(explanation) = &verdict.check.explanation {
                line.push_str(&format!(" Hint: {explanation}"));
            }
            line
        };
        format!(
            "<previous_question>\n\
            You asked: {}\n\
            Expected answer: {}\n\
            {outcome}\n\
            </previous_question>",
            verdict.question.question, verdict.question.expected_answer
        )
    }
}
