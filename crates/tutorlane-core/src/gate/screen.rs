//! Text screens applied to accepted turns: normalization and gibberish.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

/// Runs of sentence punctuation (`!!!`, `?!?`, `...`).
static PUNCT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?.]{2,}").expect("valid punctuation regex"));

/// Short utterances that are meaningful on their own.
const SHORT_WHITELIST: &[&str] = &[
    // affirmations / negations
    "yes", "yeah", "yep", "yup", "no", "nope", "nah", "ok", "okay", "sure", "si", "sí",
    // pronouns and articles
    "i", "me", "my", "we", "us", "he", "it", "a", "an",
    // common two-letter words
    "am", "as", "at", "be", "by", "do", "go", "hi", "if", "in", "is", "of", "oh", "on", "or",
    "so", "to", "up",
    // spanish
    "el", "la", "lo", "mi", "tu", "yo", "de", "en", "es", "un",
    // number words
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen",
    "eighteen", "nineteen", "twenty", "hundred",
];

/// Longest digit string still treated as a spoken numeric answer.
const MAX_NUMERIC_DIGITS: usize = 4;

/// Lowercase, trim, collapse punctuation runs and whitespace, strip
/// trailing punctuation.
pub fn normalize_input(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let collapsed = PUNCT_RUN.replace_all(lowered.trim(), |caps: &regex::Captures<'_>| {
        caps[0].chars().next().map(String::from).unwrap_or_default()
    });
    let spaced = collapsed.split_whitespace().collect::<Vec<_>>().join(" ");
    spaced
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

fn strip_token(token: &str) -> &str {
    token.trim_matches(|c: char| c.is_ascii_punctuation() && c != '-')
}

/// Whether a token is a plausible spoken number ("4", "-2", "3.5").
fn is_numeric_answer(token: &str) -> bool {
    let body = token.strip_prefix('-').unwrap_or(token);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    let dots = body.chars().filter(|c| *c == '.').count();
    !body.is_empty()
        && dots <= 1
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits > 0
        && digits <= MAX_NUMERIC_DIGITS
}

fn is_whitelisted(token: &str) -> bool {
    SHORT_WHITELIST.contains(&token) || is_numeric_answer(token)
}

fn has_long_repeat(token: &str) -> bool {
    let mut run = 0;
    let mut last = None;
    for ch in token.chars() {
        if Some(ch) == last {
            run += 1;
        } else {
            run = 1;
            last = Some(ch);
        }
        if run >= 5 {
            return true;
        }
    }
    false
}

/// A token that carries no linguistic content.
pub fn is_junk_token(raw_token: &str) -> bool {
    let token = strip_token(raw_token);
    if token.is_empty() {
        return true;
    }
    if is_whitelisted(token) {
        return false;
    }
    if !token.chars().any(char::is_alphabetic) {
        // pure digits beyond a spoken number, or pure symbols
        return true;
    }
    if has_long_repeat(token) {
        return true;
    }
    let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() <= 2 {
        return true;
    }
    let has_vowel = letters
        .iter()
        .any(|c| "aeiouyáéíóúü".contains(c.to_lowercase().next().unwrap_or(*c)));
    !has_vowel
}

/// An utterance is gibberish when every token is junk.
pub fn is_gibberish(normalized: &str) -> bool {
    let mut tokens = normalized.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return false;
    }
    tokens.all(is_junk_token)
}

/// Single short answers ("yes", "4") are expected to repeat across turns.
pub fn is_repeatable_short_answer(normalized: &str) -> bool {
    let mut tokens = normalized.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(only), None) => is_whitelisted(strip_token(only)),
        _ => false,
    }
}

/// Bounded history of a session's recent normalized inputs.
#[derive(Debug, Clone)]
pub struct RecentInputs {
    window: usize,
    items: VecDeque<String>,
}

impl RecentInputs {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            items: VecDeque::with_capacity(window.max(1)),
        }
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.items.iter().any(|item| item == normalized)
    }

    pub fn record(&mut self, normalized: String) {
        if self.items.len() == self.window {
            self.items.pop_front();
        }
        self.items.push_back(normalized);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for RecentInputs {
    fn default() -> Self {
        Self::new(5)
    }
}
