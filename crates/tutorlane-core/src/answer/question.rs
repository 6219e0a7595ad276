//! Recognition of simple arithmetic questions posed by the tutor.

use std::sync::LazyLock;

use regex::Regex;
use tutorlane_types::answer::{PendingQuestion, QuestionType};
use tutorlane_types::lesson::Subject;

use super::numbers::{format_number, parse_operand};
use crate::text::split_sentences;

static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    let operand = r"(\d+|zero|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)";
    let operator = r"(\+|plus|minus|-|−|times|multiplied by|x|×|\*|divided by|/|÷)";
    Regex::new(&format!(r"(?i)\b{operand}\s*{operator}\s*{operand}\b"))
        .expect("valid arithmetic regex")
});

fn apply(lhs: f64, operator: &str, rhs: f64) -> Option<f64> {
    match operator.to_lowercase().as_str() {
        "+" | "plus" => Some(lhs + rhs),
        "-" | "−" | "minus" => Some(lhs - rhs),
        "times" | "multiplied by" | "x" | "×" | "*" => Some(lhs * rhs),
        "divided by" | "/" | "÷" if rhs != 0.0 => Some(lhs / rhs),
        _ => None,
    }
}

/// Find an arithmetic question in `text` and compute its expected answer.
///
/// Only sentences that read as questions are considered, so a worked
/// example like "3 + 4 is 7." does not become a pending question.
pub fn extract_question(text: &str) -> Option<PendingQuestion> {
    split_sentences(text)
        .into_iter()
        .filter(|sentence| sentence.ends_with('?'))
        .find_map(|sentence| {
            let caps = ARITHMETIC.captures(&sentence)?;
            let lhs = parse_operand(&caps[1])?;
            let rhs = parse_operand(&caps[3])?;
            let answer = apply(lhs, &caps[2], rhs)?;
            Some(PendingQuestion {
                question: sentence.clone(),
                expected_answer: format_number(answer),
                subject: Subject::Math,
                question_type: QuestionType::Math,
                options: Vec::new(),
            })
        })
}
