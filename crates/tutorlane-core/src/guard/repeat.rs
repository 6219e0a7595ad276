//! Anti-repeat: never say (nearly) the same thing twice in a row.

use crate::text::{jaccard, normalize};

/// Word-overlap at or above which two responses count as a repeat.
pub const REPEAT_OVERLAP: f64 = 0.8;

const ALTERNATIVES: &[&str] = &[
    "Let's try it from a new angle. What part feels tricky right now?",
    "Here's another way to think about it. Can you walk me through your idea?",
    "Let's take one small step. What do you already know about this?",
    "Good thinking so far. What would you try next?",
];

const TOPIC_ALTERNATIVES: &[&str] = &[
    "Let's try {topic} from a new angle. What part feels tricky right now?",
    "Here's another way into {topic}. Can you walk me through your idea?",
    "Let's take one small step with {topic}. What do you already know?",
];

const FILLER: &str = "Let's pause and regroup for a moment. What would you like to try?";

pub fn is_repeat<'a>(candidate: &str, recent: impl IntoIterator<Item = &'a str>) -> bool {
    let candidate = normalize(candidate);
    recent.into_iter().any(|previous| {
        let previous = normalize(previous);
        previous == candidate || jaccard(&previous, &candidate) >= REPEAT_OVERLAP
    })
}

/// Pick the next rotation entry that does not itself collide with `recent`.
///
/// Advances `cursor` past the chosen entry. Falls back to a generic filler
/// when every rotation entry collides.
pub fn alternative(recent: &[String], topic: Option<&str>, cursor: &mut usize) -> String {
    let pool: Vec<String> = match topic {
        Some(topic) => TOPIC_ALTERNATIVES
            .iter()
            .map(|template| template.replace("{topic}", topic))
            .collect(),
        None => ALTERNATIVES.iter().map(|s| s.to_string()).collect(),
    };
    for offset in 0..pool.len() {
        let index = (*cursor + offset) % pool.len();
        let candidate = &pool[index];
        if !is_repeat(candidate, recent.iter().map(String::as_str)) {
            *cursor = index + 1;
            return candidate.clone();
        }
    }
    FILLER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_and_near_duplicates_collide() {
        let history = recent(&["What is 2 + 2?", "Great job! What comes after ten?"]);
        let refs = || history.iter().map(String::as_str);
        assert!(is_repeat("what is 2 + 2", refs()));
        assert!(is_repeat("Great job. What comes after ten?", refs()));
        assert!(!is_repeat("What is 3 + 5?", refs()));
    }

    #[test]
    fn alternatives_rotate_and_skip_collisions() {
        let mut cursor = 0;
        let first = alternative(&[], None, &mut cursor);
        let history = recent(&[first.as_str()]);
        let second = alternative(&history, None, &mut cursor);
        assert_ne!(first, second);
        assert!(second.ends_with('?'));
    }

    #[test]
    fn topic_alternatives_mention_topic() {
        let mut cursor = 0;
        let alt = alternative(&[], Some("fractions"), &mut cursor);
        assert!(alt.contains("fractions"));
        assert_eq!(cursor, 1);
    }

    #[test]
    fn filler_when_everything_collides() {
        let history: Vec<String> = ALTERNATIVES.iter().map(|s| s.to_string()).collect();
        let mut cursor = 0;
        assert_eq!(alternative(&history, None, &mut cursor), FILLER);
    }
}
