//! Scripted responses for when the provider path is unavailable.
//!
//! The selector rotates through a subject bank, avoiding the session's last
//! three picks, and closes the loop on any question the tutor asked last
//! turn: the student's reply is checked and acknowledged before the next
//! scripted question is posed.

pub mod banks;

use std::fmt;

use rand::seq::SliceRandom;
use tutorlane_types::answer::PendingQuestion;
use tutorlane_types::gate::GateReason;
use tutorlane_types::lesson::Subject;

use crate::answer::{check_answer, extract_question};
use crate::session::SessionState;
use banks::{BankEntry, bank};

/// Why the fallback path was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The gate rejected the input; ask the student to repeat.
    Gated(GateReason),
    /// The circuit breaker is open.
    BreakerOpen,
    /// Transient failures used up the retry budget.
    RetriesExhausted,
    /// Permanent provider failure or no provider configured.
    ProviderOffline,
}

impl FallbackReason {
    pub fn banner(&self) -> &'static str {
        match self {
            FallbackReason::Gated(_) => "Didn't catch that: please try again",
            FallbackReason::BreakerOpen => "High traffic: using quick tips",
            FallbackReason::RetriesExhausted => "Connection is slow: using quick practice",
            FallbackReason::ProviderOffline => "Practice mode: tutor is offline",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Gated(reason) => write!(f, "gated:{reason}"),
            FallbackReason::BreakerOpen => write!(f, "breaker_open"),
            FallbackReason::RetriesExhausted => write!(f, "retries_exhausted"),
            FallbackReason::ProviderOffline => write!(f, "provider_offline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResponse {
    pub content: String,
    pub banner: String,
}

const PRAISE: &[&str] = &["Nice work, that's right!", "Yes, exactly right!", "Great job, you got it!"];

#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackSelector;

impl FallbackSelector {
    pub fn new() -> Self {
        Self
    }

    /// Choose scripted content for `subject`.
    ///
    /// With a session, the pick avoids its last three selections and any
    /// pending question is checked against `user_input` first. Gated turns
    /// only ask for a repeat and leave the pending question in place.
    pub fn select(
        &self,
        subject: Subject,
        user_input: Option<&str>,
        session: Option<&mut SessionState>,
        reason: FallbackReason,
    ) -> FallbackResponse {
        let banner = reason.banner().to_string();
        if let FallbackReason::Gated(gate_reason) = reason {
            let pending = session.as_ref().and_then(|state| state.pending_question());
            return FallbackResponse {
                content: clarify(gate_reason, pending),
                banner,
            };
        }

        let Some(state) = session else {
            let entries = bank(subject);
            let entry = entries
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(entries[0]);
            return FallbackResponse {
                content: entry.text.to_string(),
                banner,
            };
        };

        let prefix = state
            .take_pending_question()
            .map(|pending| acknowledge(&pending, user_input.unwrap_or_default()));

        let (index, entry) = pick(subject, state);
        state.record_fallback(subject, index);
        state.set_pending_question(pending_from(subject, &entry));

        let content = match prefix {
            Some(prefix) => format!("{prefix} {}", entry.text),
            None => entry.text.to_string(),
        };
        tracing::debug!(%subject, %reason, index, "fallback selected");
        FallbackResponse { content, banner }
    }
}

fn clarify(reason: GateReason, pending: Option<&PendingQuestion>) -> String {
    let lead = match reason {
        GateReason::Repetition => "I think I heard that one already.",
        GateReason::Gibberish => "I didn't quite understand that.",
        _ => "I didn't catch that.",
    };
    match pending {
        Some(pending) => format!("{lead} {}", pending.question),
        None => format!("{lead} Could you say it again?"),
    }
}

fn acknowledge(pending: &PendingQuestion, user_input: &str) -> String {
    let check = check_answer(
        user_input,
        &pending.expected_answer,
        pending.question_type,
        &pending.options,
    );
    if check.is_correct {
        let seed: usize = user_input.bytes().map(usize::from).sum();
        PRAISE[seed % PRAISE.len()].to_string()
    } else {
        format!("Not quite, the answer was {}.", pending.expected_answer.trim())
    }
}

/// Pick an entry not among the session's recent picks for this subject,
/// resetting the rotation once every entry has been used.
fn pick(subject: Subject, state: &mut SessionState) -> (usize, BankEntry) {
    let entries = bank(subject);
    let recent: Vec<usize> = state
        .recent_fallbacks()
        .filter(|(s, _)| *s == subject)
        .map(|(_, index)| *index)
        .collect();
    let mut available: Vec<usize> = (0..entries.len()).filter(|i| !recent.contains(i)).collect();
    if available.is_empty() {
        state.reset_fallback_rotation(subject);
        available = (0..entries.len()).collect();
    }
    let index = available
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(0);
    (index, entries[index])
}

fn pending_from(subject: Subject, entry: &BankEntry) -> Option<PendingQuestion> {
    match entry.answer {
        Some(answer) => Some(PendingQuestion {
            question: question_sentence(entry.text),
            expected_answer: answer.to_string(),
            subject,
            question_type: entry.question_type,
            options: Vec::new(),
        }),
        None => extract_question(entry.text),
    }
}

fn question_sentence(text: &str) -> String {
    crate::text::split_sentences(text)
        .into_iter()
        .find(|sentence| sentence.ends_with('?'))
        .unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::format::is_well_formed;
    use crate::session::{SessionRegistry, lock_session};
    use tutorlane_types::answer::QuestionType;

    fn pending_math(question: &str, answer: &str) -> PendingQuestion {
        PendingQuestion {
            question: question.to_string(),
            expected_answer: answer.to_string(),
            subject: Subject::Math,
            question_type: QuestionType::Math,
            options: Vec::new(),
        }
    }

    #[test]
    fn banners_describe_the_reason() {
        assert_eq!(FallbackReason::BreakerOpen.banner(), "High traffic: using quick tips");
        assert!(FallbackReason::ProviderOffline.banner().contains("offline"));
    }

    #[test]
    fn no_immediate_repeats_within_rotation_window() {
        let selector = FallbackSelector::new();
        let registry = SessionRegistry::default();
        let handle = registry.get_or_create("s1");
        let mut state = lock_session(&handle);

        let mut picks: Vec<String> = Vec::new();
        for _ in 0..20 {
            let response =
                selector.select(Subject::Math, Some("hm"), Some(&mut state), FallbackReason::BreakerOpen);
            let question = question_sentence(&response.content);
            let window = picks.iter().rev().take(3);
            for previous in window {
                assert_ne!(previous, &question);
            }
            picks.push(question);
        }
    }

    #[test]
    fn rotation_resets_when_bank_is_exhausted() {
        let registry = SessionRegistry::default();
        let handle = registry.get_or_create("s1");
        let mut state = lock_session(&handle);
        let size = bank(Subject::Spanish).len();
        for index in 0..size {
            state.record_fallback(Subject::Spanish, index);
        }
        // Only the last three are remembered, so there is always a choice.
        let (index, _) = pick(Subject::Spanish, &mut state);
        assert!(index < size);
    }

    #[test]
    fn correct_answer_to_pending_question_is_praised() {
        let selector = FallbackSelector::new();
        let registry = SessionRegistry::default();
        let handle = registry.get_or_create("s1");
        let mut state = lock_session(&handle);
        state.set_pending_question(Some(pending_math("What is 2 + 2?", "4")));

        let response = selector.select(
            Subject::Math,
            Some("four"),
            Some(&mut state),
            FallbackReason::RetriesExhausted,
        );
        assert!(PRAISE.iter().any(|p| response.content.starts_with(p)), "{}", response.content);
        assert_eq!(response.banner, "Connection is slow: using quick practice");
        // A new math question replaces the old record.
        let next = state.pending_question().expect("new pending question");
        assert_ne!(next.question, "What is 2 + 2?");
    }

    #[test]
    fn spoken_answer_above_ten_is_praised() {
        let selector = FallbackSelector::new();
        let registry = SessionRegistry::default();
        let handle = registry.get_or_create("s1");
        let mut state = lock_session(&handle);
        state.set_pending_question(Some(pending_math("What is 7 + 5?", "12")));

        let response = selector.select(
            Subject::Math,
            Some("twelve"),
            Some(&mut state),
            FallbackReason::RetriesExhausted,
        );
        assert!(PRAISE.iter().any(|p| response.content.starts_with(p)), "{}", response.content);
    }

    #[test]
    fn wrong_answer_is_corrected() {
        let selector = FallbackSelector::new();
        let registry = SessionRegistry::default();
        let handle = registry.get_or_create("s1");
        let mut state = lock_session(&handle);
        state.set_pending_question(Some(pending_math("What is 2 + 2?", "4")));

        let response =
            selector.select(Subject::Math, Some("5"), Some(&mut state), FallbackReason::BreakerOpen);
        assert!(response.content.starts_with("Not quite, the answer was 4."));
    }

    #[test]
    fn english_entries_store_explicit_answers() {
        let entry = bank(Subject::English)[0];
        let pending = pending_from(Subject::English, &entry).unwrap();
        assert_eq!(pending.expected_answer, "cold");
        assert_eq!(pending.question, "What is the opposite of hot?");
        assert!(pending_from(Subject::General, &bank(Subject::General)[0]).is_none());
    }

    #[test]
    fn gated_fallback_repeats_pending_question() {
        let selector = FallbackSelector::new();
        let registry = SessionRegistry::default();
        let handle = registry.get_or_create("s1");
        let mut state = lock_session(&handle);
        state.set_pending_question(Some(pending_math("What is 3 + 3?", "6")));

        let response = selector.select(
            Subject::Math,
            None,
            Some(&mut state),
            FallbackReason::Gated(GateReason::SpeechTooShort),
        );
        assert_eq!(response.content, "I didn't catch that. What is 3 + 3?");
        assert!(state.pending_question().is_some(), "gating does not consume the question");
    }

    #[test]
    fn sessionless_selection_is_well_formed() {
        let response = FallbackSelector::new().select(
            Subject::General,
            None,
            None,
            FallbackReason::ProviderOffline,
        );
        assert!(is_well_formed(&response.content));
    }
}
