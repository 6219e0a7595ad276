//! Text comparison helpers shared by the answer checker and the guard.

use std::collections::HashSet;

/// Case-fold, strip punctuation, collapse whitespace.
///
/// Apostrophes inside words are dropped rather than split on, so
/// "don't" and "dont" compare equal.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\'' || ch == '’' {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Distinct words of an already-normalized string.
pub fn word_set(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

/// Word-level Jaccard overlap of two strings (normalized internally).
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let sa = word_set(&a);
    let sb = word_set(&b);
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let intersection = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    if union == 0.0 { 0.0 } else { intersection / union }
}

/// Character-level Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - levenshtein / max_len`, in `[0, 1]`.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Fuzzy similarity: 70% word overlap, 30% normalized edit distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }
    0.7 * jaccard(&na, &nb) + 0.3 * edit_similarity(&na, &nb)
}

/// Split text into trimmed sentences, keeping terminal punctuation.
///
/// A `.`, `!` or `?` ends a sentence only when followed by whitespace or
/// the end of input, so decimals like `2.5` stay intact.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            while i + 1 < chars.len() && matches!(chars[i + 1], '.' | '!' | '?') {
                i += 1;
                current.push(chars[i]);
            }
            if i + 1 == chars.len() || chars[i + 1].is_whitespace() {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
            }
        }
        i += 1;
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  The CAT, sat!  "), "the cat sat");
        assert_eq!(normalize("don't"), "dont");
        assert_eq!(normalize("3.5"), "3 5");
        assert_eq!(normalize("¡Hola!"), "hola");
    }

    #[test]
    fn jaccard_overlap() {
        assert!((jaccard("the cat sat", "the cat sat") - 1.0).abs() < 1e-9);
        assert!((jaccard("a b", "c d") - 0.0).abs() < 1e-9);
        assert!((jaccard("a b c", "a b d") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn similarity_weights_word_overlap() {
        assert_eq!(similarity("", "cat"), 0.0);
        assert_eq!(similarity("Cat!", "cat"), 1.0);
        let close = similarity("photosynthesis", "photosynthesys");
        assert!(close > 0.2 && close < 0.5, "typo only earns edit credit: {close}");
        let overlap = similarity("the water cycle", "water cycle");
        assert!(overlap > 0.6 && overlap < 0.7, "{overlap}");
    }

    #[test]
    fn split_sentences_keeps_decimals_and_terminators() {
        let parts = split_sentences("Half is 0.5. Right?! Now try this");
        assert_eq!(parts, vec!["Half is 0.5.", "Right?!", "Now try this"]);
        assert!(split_sentences("   ").is_empty());
    }
}
