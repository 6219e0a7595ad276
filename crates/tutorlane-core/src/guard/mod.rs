//! Content safety and speech-format guard.
//!
//! Every candidate response passes through [`apply`] whatever its origin
//! (provider, cache or fallback), in a fixed order:
//!
//! 1. hard block of physical-action instructions
//! 2. inclusive-language rewrite
//! 3. topic redirect when the active lesson is not referenced
//! 4. anti-repeat against the session's recent responses
//! 5. format: at most two sentences, ending with a question
//!
//! Format runs last so the shape invariant survives every substitution.

pub mod format;
pub mod repeat;
pub mod safety;

use tutorlane_types::lesson::LessonContext;

use crate::text::normalize;

/// Words too generic to show a response is on-topic.
const TITLE_NOISE: &[&str] = &[
    "lesson", "introduction", "intro", "basics", "basic", "with", "about", "part", "unit",
    "level", "practice", "review", "and", "the", "for",
];

/// Per-call inputs the guard reads and updates.
#[derive(Debug)]
pub struct GuardContext<'a> {
    pub lesson: Option<&'a LessonContext>,
    /// Last emitted responses for the session, oldest first.
    pub recent_responses: &'a [String],
    /// Rotation cursor for anti-repeat substitutes; advanced on use.
    pub repeat_cursor: &'a mut usize,
}

/// Final text plus what the guard did to get there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardOutcome {
    pub content: String,
    pub blocked: bool,
    pub rewritten: bool,
    pub redirected: bool,
    pub repeat_substituted: bool,
}

impl GuardOutcome {
    /// Whether the original candidate survived as the basis of the output.
    pub fn kept_candidate(&self) -> bool {
        !self.blocked && !self.repeat_substituted
    }
}

fn mentions(words: &[&str], term: &str) -> bool {
    words.iter().any(|word| {
        *word == term
            || (term.len() >= 4 && word.len() >= 4 && (word.starts_with(term) || term.starts_with(word)))
    })
}

/// Whether `candidate` refers to the lesson's title or any key term.
pub fn references_topic(candidate: &str, lesson: &LessonContext) -> bool {
    let normalized = normalize(candidate);
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let padded = format!(" {normalized} ");

    let key_term_hit = lesson.key_terms.iter().any(|term| {
        let term = normalize(term);
        !term.is_empty()
            && (padded.contains(&format!(" {term} "))
                || (!term.contains(' ') && mentions(&words, &term)))
    });
    if key_term_hit {
        return true;
    }

    let title = normalize(&lesson.title);
    let significant: Vec<&str> = title
        .split_whitespace()
        .filter(|word| word.len() > 3 && !TITLE_NOISE.contains(word))
        .collect();
    // A title made only of noise words cannot be referenced; don't redirect.
    significant.is_empty() || significant.iter().any(|word| mentions(&words, word))
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match (chars.next(), text.chars().nth(1)) {
        (Some(first), Some(second)) if first.is_uppercase() && !second.is_uppercase() => {
            let rest = &text[first.len_utf8()..];
            if text.starts_with("I ") {
                text.to_string()
            } else {
                format!("{}{rest}", first.to_lowercase())
            }
        }
        _ => text.to_string(),
    }
}

fn topic_label(lesson: &LessonContext) -> Option<&str> {
    let title = lesson.title.trim();
    (!title.is_empty()).then_some(title)
}

/// Run a candidate through every guard stage.
pub fn apply(candidate: &str, ctx: &mut GuardContext<'_>) -> GuardOutcome {
    let mut outcome = GuardOutcome::default();
    let mut text = candidate.trim().to_string();

    if let Some(phrase) = safety::blocked_phrase(&text) {
        tracing::info!(phrase, "blocked physical-action instruction");
        text = safety::safe_redirect(*ctx.repeat_cursor).to_string();
        outcome.blocked = true;
    }

    if let Some(rewritten) = safety::rewrite_inclusive(&text) {
        text = rewritten;
        outcome.rewritten = true;
    }

    let topic = ctx.lesson.and_then(topic_label);
    if let (Some(lesson), Some(label)) = (ctx.lesson, topic) {
        if !text.is_empty() && !references_topic(&text, lesson) {
            text = format!("Coming back to {label}, {}", lower_first(&text));
            outcome.redirected = true;
        }
    }

    let preview = format::enforce(&text);
    if repeat::is_repeat(&preview, ctx.recent_responses.iter().map(String::as_str)) {
        tracing::debug!("response repeats a recent one, substituting");
        text = repeat::alternative(ctx.recent_responses, topic, ctx.repeat_cursor);
        outcome.repeat_substituted = true;
    }

    outcome.content = format::enforce(&text);
    outcome
}
