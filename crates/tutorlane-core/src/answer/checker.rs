//! Type-specific answer scoring.

use tutorlane_types::answer::{AnswerCheck, CheckMethod, QuestionType};

use super::numbers::{extract_number, format_number};
use crate::text::{normalize, similarity, word_set};

const EXACT_CONFIDENCE: f64 = 0.95;
const OPTION_CONFIDENCE: f64 = 0.9;
const KEYWORD_CONFIDENCE: f64 = 0.6;
const NUMERIC_TOLERANCE: f64 = 0.001;
const MCQ_FUZZY_THRESHOLD: f64 = 0.8;
const SHORT_FUZZY_THRESHOLD: f64 = 0.7;
const OPEN_FUZZY_THRESHOLD: f64 = 0.3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "who", "did", "get", "may", "him", "she",
    "use", "that", "with", "have", "this", "from", "they", "will", "what", "when", "which",
    "their", "there", "been", "into", "than", "then", "them", "these", "some", "very", "your",
];

/// Score `user_answer` against `expected` for the given question type.
///
/// `options` is only consulted for multiple-choice questions.
pub fn check_answer(
    user_answer: &str,
    expected: &str,
    question_type: QuestionType,
    options: &[String],
) -> AnswerCheck {
    let user = normalize(user_answer);
    if user.is_empty() {
        return AnswerCheck {
            is_correct: false,
            confidence: 0.0,
            method: CheckMethod::EmptyInput,
            correction: Some(correction(expected)),
            explanation: Some("I didn't hear an answer that time.".to_string()),
        };
    }

    match question_type {
        QuestionType::Math => check_math(user_answer, &user, expected),
        QuestionType::Mcq => check_mcq(&user, expected, options),
        QuestionType::Short => check_short(&user, expected),
        QuestionType::Open => check_open(&user, expected),
    }
}

fn correction(expected: &str) -> String {
    format!("The correct answer is {}.", expected.trim())
}

fn check_math(raw_user: &str, user: &str, expected: &str) -> AnswerCheck {
    let Some(expected_num) = extract_number(expected) else {
        // Expected value is not numeric; compare as text.
        return check_short(user, expected);
    };
    let Some(user_num) = extract_number(raw_user) else {
        return AnswerCheck {
            is_correct: false,
            confidence: 0.3,
            method: CheckMethod::Numeric,
            correction: Some(correction(&format_number(expected_num))),
            explanation: Some("I was listening for a number.".to_string()),
        };
    };

    let gap = user_num - expected_num;
    if gap.abs() < NUMERIC_TOLERANCE {
        return AnswerCheck {
            is_correct: true,
            confidence: EXACT_CONFIDENCE,
            method: CheckMethod::Numeric,
            correction: None,
            explanation: None,
        };
    }

    let distance = format_number(gap.abs());
    let explanation = if (gap.abs() - 1.0).abs() < NUMERIC_TOLERANCE {
        if gap < 0.0 {
            format!("You were off by {distance}. Try adding one more.")
        } else {
            format!("You were off by {distance}. That's one more than we need.")
        }
    } else {
        format!("You were off by {distance}. Let's step through it together.")
    };
    AnswerCheck {
        is_correct: false,
        confidence: EXACT_CONFIDENCE,
        method: CheckMethod::Numeric,
        correction: Some(correction(&format_number(expected_num))),
        explanation: Some(explanation),
    }
}

/// Option index for a letter (`a`..`d`) or digit (`1`..`4`) answer.
fn option_index(answer: &str) -> Option<usize> {
    let token = answer
        .strip_prefix("option ")
        .or_else(|| answer.strip_prefix("letter "))
        .or_else(|| answer.strip_prefix("number "))
        .unwrap_or(answer)
        .trim();
    match token {
        "a" | "1" | "one" => Some(0),
        "b" | "2" | "two" => Some(1),
        "c" | "3" | "three" => Some(2),
        "d" | "4" | "four" => Some(3),
        _ => None,
    }
}

fn check_mcq(user: &str, expected: &str, options: &[String]) -> AnswerCheck {
    let expected_norm = normalize(expected);
    if user == expected_norm {
        return exact();
    }

    let expected_index = options
        .iter()
        .position(|option| normalize(option) == expected_norm)
        .or_else(|| option_index(&expected_norm));
    let expected_text = expected_index
        .and_then(|i| options.get(i))
        .map(String::as_str)
        .unwrap_or(expected);

    if let (Some(user_index), Some(expected_index)) = (option_index(user), expected_index) {
        if user_index == expected_index {
            return AnswerCheck {
                is_correct: true,
                confidence: OPTION_CONFIDENCE,
                method: CheckMethod::OptionIndex,
                correction: None,
                explanation: None,
            };
        }
    }

    let score = similarity(user, &normalize(expected_text));
    AnswerCheck {
        is_correct: score > MCQ_FUZZY_THRESHOLD,
        confidence: score,
        method: CheckMethod::Fuzzy,
        correction: (score <= MCQ_FUZZY_THRESHOLD).then(|| correction(expected_text)),
        explanation: None,
    }
}

fn check_short(user: &str, expected: &str) -> AnswerCheck {
    let expected_norm = normalize(expected);
    if user == expected_norm {
        return exact();
    }
    let score = similarity(user, &expected_norm);
    let is_correct = score > SHORT_FUZZY_THRESHOLD;
    AnswerCheck {
        is_correct,
        confidence: score,
        method: CheckMethod::Fuzzy,
        correction: (!is_correct).then(|| correction(expected)),
        explanation: None,
    }
}

fn keywords(expected_norm: &str) -> Vec<&str> {
    let mut seen = Vec::new();
    for word in expected_norm.split_whitespace() {
        if word.chars().count() > 2 && !STOPWORDS.contains(&word) && !seen.contains(&word) {
            seen.push(word);
        }
    }
    seen
}

fn check_open(user: &str, expected: &str) -> AnswerCheck {
    let expected_norm = normalize(expected);
    let score = similarity(user, &expected_norm);
    let user_words = word_set(user);
    let keywords = keywords(&expected_norm);
    let keyword_hit = keywords.iter().any(|word| user_words.contains(word));

    if keyword_hit || score > OPEN_FUZZY_THRESHOLD {
        let (confidence, method) = if keyword_hit {
            (score.max(KEYWORD_CONFIDENCE), CheckMethod::Keyword)
        } else {
            (score, CheckMethod::Fuzzy)
        };
        return AnswerCheck {
            is_correct: true,
            confidence,
            method,
            correction: None,
            explanation: None,
        };
    }

    let missing: Vec<&str> = keywords.into_iter().take(3).collect();
    let explanation = if missing.is_empty() {
        "Try explaining it in your own words.".to_string()
    } else {
        format!("Try including ideas like: {}.", missing.join(", "))
    };
    AnswerCheck {
        is_correct: false,
        confidence: score,
        method: CheckMethod::Keyword,
        correction: None,
        explanation: Some(explanation),
    }
}

fn exact() -> AnswerCheck {
    AnswerCheck {
        is_correct: true,
        confidence: EXACT_CONFIDENCE,
        method: CheckMethod::ExactMatch,
        correction: None,
        explanation: None,
    }
}
