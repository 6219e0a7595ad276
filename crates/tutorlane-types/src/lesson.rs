//! Lesson context consumed from the lesson collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subject partition used for fallback banks and question typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    English,
    Spanish,
    #[default]
    General,
}

impl Subject {
    pub const ALL: [Subject; 4] = [
        Subject::Math,
        Subject::English,
        Subject::Spanish,
        Subject::General,
    ];
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Math => write!(f, "math"),
            Subject::English => write!(f, "english"),
            Subject::Spanish => write!(f, "spanish"),
            Subject::General => write!(f, "general"),
        }
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" | "maths" | "mathematics" => Ok(Subject::Math),
            "english" | "ela" | "reading" => Ok(Subject::English),
            "spanish" | "espanol" | "español" => Ok(Subject::Spanish),
            "general" => Ok(Subject::General),
            other => Err(format!("invalid subject: '{other}'")),
        }
    }
}

/// What the lesson collaborator knows about the active lesson.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContext {
    pub subject: Subject,
    pub title: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub key_terms: Vec<String>,
}
