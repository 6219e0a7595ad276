//! Hard block of physical-action instructions and inclusive rewrites.
//!
//! Students may be listening with no screen, no board and limited
//! mobility, so the tutor never asks them to look at, point to or
//! physically do anything.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::text::normalize;

/// Phrases that discard the whole candidate.
const BLOCKED_PHRASES: &[&str] = &[
    "raise your hand",
    "raise your hands",
    "stand up",
    "sit down",
    "clap your hands",
    "jump up and down",
    "touch your toes",
    "wave your hand",
    "look at the board",
    "write on the board",
    "come to the front",
    "point at the screen",
];

const SAFE_REDIRECTS: &[&str] = &[
    "Let's keep talking it through together. What do you think the answer is?",
    "We can do this one out loud. Can you tell me your idea?",
    "Let's think about it together. What comes to mind first?",
];

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

static REWRITES: LazyLock<Vec<Rewrite>> = LazyLock::new(|| {
    [
        (r"(?i)\bas you can see\b", "as we discussed"),
        (r"(?i)\bcan you see\b", "can you picture"),
        (r"(?i)\bsee the (picture|image|diagram|chart)\b", "imagine the $1"),
        (r"(?i)\blook at\b", "think about"),
        (r"(?i)\bwrite (it|this|that) down\b", "keep $1 in mind"),
        (r"(?i)\bpoint to\b", "tell me"),
        (r"(?i)\bwatch (this|me)\b", "listen to $1"),
        (r"(?i)\bclick\b", "choose"),
        (r"(?i)\bguys\b", "everyone"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| Rewrite {
        pattern: Regex::new(pattern).expect("valid rewrite regex"),
        replacement,
    })
    .collect()
});

/// First blocked phrase found in `candidate`, if any.
pub fn blocked_phrase(candidate: &str) -> Option<&'static str> {
    let padded = format!(" {} ", normalize(candidate));
    BLOCKED_PHRASES
        .iter()
        .find(|phrase| padded.contains(&format!(" {phrase} ")))
        .copied()
}

/// Canned replacement for a blocked candidate, rotated by `seed`.
pub fn safe_redirect(seed: usize) -> &'static str {
    SAFE_REDIRECTS[seed % SAFE_REDIRECTS.len()]
}

fn capitalize_like(matched: &str, replacement: String) -> String {
    if matched.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => replacement,
        }
    } else {
        replacement
    }
}

/// Apply every inclusive rewrite. Returns `None` when nothing changed.
pub fn rewrite_inclusive(candidate: &str) -> Option<String> {
    let mut text = candidate.to_string();
    let mut changed = false;
    for rule in REWRITES.iter() {
        if !rule.pattern.is_match(&text) {
            continue;
        }
        text = rule
            .pattern
            .replace_all(&text, |caps: &Captures<'_>| {
                let mut expanded = String::new();
                caps.expand(rule.replacement, &mut expanded);
                capitalize_like(&caps[0], expanded)
            })
            .into_owned();
        changed = true;
    }
    changed.then_some(text)
}
