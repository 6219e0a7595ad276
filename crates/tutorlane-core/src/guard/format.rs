//! Speech format: at most two sentences, ending with a question.

use crate::text::split_sentences;

const FOLLOW_UPS: &[&str] = &[
    "What do you think?",
    "Can you tell me more?",
    "Does that make sense to you?",
    "Want to try the next one?",
];

/// Follow-up question chosen deterministically from the kept text, so
/// formatting the same candidate twice gives the same result.
fn follow_up_for(text: &str) -> &'static str {
    let seed: usize = text.bytes().map(usize::from).sum();
    FOLLOW_UPS[seed % FOLLOW_UPS.len()]
}

fn is_question(sentence: &str) -> bool {
    sentence
        .trim_end_matches(|c: char| matches!(c, '!' | '.'))
        .ends_with('?')
}

/// Replace a trailing punctuation run (`?!`, `?.`) with a single `?`.
fn as_question(sentence: &str) -> String {
    let body = sentence.trim_end_matches(|c: char| matches!(c, '?' | '!' | '.'));
    format!("{body}?")
}

fn as_statement(sentence: &str) -> String {
    if sentence.ends_with(['.', '!']) {
        sentence.to_string()
    } else {
        format!("{sentence}.")
    }
}

/// Enforce the two-sentence, ends-with-a-question shape.
///
/// Keeps the text up to and including the first question when that fits
/// in two sentences; a later question is paired with the opening sentence.
/// Without any question the opening sentence gets a generic follow-up.
pub fn enforce(candidate: &str) -> String {
    let sentences = split_sentences(candidate);
    if sentences.is_empty() {
        return FOLLOW_UPS[0].to_string();
    }

    match sentences.iter().position(|s| is_question(s)) {
        Some(0) => as_question(&sentences[0]),
        Some(i) => format!("{} {}", as_statement(&sentences[0]), as_question(&sentences[i])),
        None => {
            let opening = as_statement(&sentences[0]);
            let follow_up = follow_up_for(&opening);
            format!("{opening} {follow_up}")
        }
    }
}

/// Whether `text` already satisfies the format invariant.
pub fn is_well_formed(text: &str) -> bool {
    let sentences = split_sentences(text);
    !sentences.is_empty() && sentences.len() <= 2 && text.trim_end().ends_with('?')
}
