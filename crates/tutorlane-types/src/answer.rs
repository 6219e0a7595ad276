//! Answer-check types shared by the checker, fallback selector and API.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::lesson::Subject;

/// Kind of question an expected answer belongs to.
///
/// Deserialization is lenient: unknown names become [`QuestionType::Short`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Math,
    Mcq,
    #[default]
    Short,
    Open,
}

impl QuestionType {
    /// Lenient parse: unknown names fall back to [`QuestionType::Short`].
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "math" | "numeric" | "number" => QuestionType::Math,
            "mcq" | "multiple_choice" | "choice" => QuestionType::Mcq,
            "open" | "open_ended" => QuestionType::Open,
            _ => QuestionType::Short,
        }
    }
}

impl<'de> Deserialize<'de> for QuestionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Math => write!(f, "math"),
            QuestionType::Mcq => write!(f, "mcq"),
            QuestionType::Short => write!(f, "short"),
            QuestionType::Open => write!(f, "open"),
        }
    }
}

/// Which comparison produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMethod {
    EmptyInput,
    Numeric,
    ExactMatch,
    OptionIndex,
    Fuzzy,
    Keyword,
}

/// Outcome of checking one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCheck {
    pub is_correct: bool,
    pub confidence: f64,
    pub method: CheckMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A question the tutor just posed, awaiting the student's next answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuestion {
    pub question: String,
    pub expected_answer: String,
    pub subject: Subject,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_question_type_defaults_to_short() {
        assert_eq!(QuestionType::parse_lenient("essay"), QuestionType::Short);
        assert_eq!(QuestionType::parse_lenient("MCQ"), QuestionType::Mcq);
        assert_eq!(QuestionType::parse_lenient("math"), QuestionType::Math);
    }

    #[test]
    fn question_type_deserializes_leniently() {
        let parsed: QuestionType = serde_json::from_str("\"essay\"").unwrap();
        assert_eq!(parsed, QuestionType::Short);
        let parsed: QuestionType = serde_json::from_str("\"Math\"").unwrap();
        assert_eq!(parsed, QuestionType::Math);
        assert_eq!(serde_json::to_value(QuestionType::Mcq).unwrap(), "mcq");
    }

    #[test]
    fn answer_check_serializes_camel_case() {
        let check = AnswerCheck {
            is_correct: true,
            confidence: 0.95,
            method: CheckMethod::Numeric,
            correction: None,
            explanation: None,
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["isCorrect"], true);
        assert_eq!(json["method"], "numeric");
        assert!(json.get("correction").is_none());
    }
}
