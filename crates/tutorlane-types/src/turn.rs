//! Turn types: the inbound request, the normalized turn, and the outbound result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound turn contract handed over by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Duration of the captured speech in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_duration: Option<u64>,
    /// Recognizer confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<f64>,
}

impl TurnRequest {
    /// Build a text-only request (no speech metadata).
    pub fn text(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            lesson_id: None,
            message: message.into(),
            speech_duration: None,
            speech_confidence: None,
            energy_level: None,
        }
    }

    pub fn with_lesson(mut self, lesson_id: impl Into<String>) -> Self {
        self.lesson_id = Some(lesson_id.into());
        self
    }

    pub fn with_speech(mut self, duration_ms: u64, confidence: f64) -> Self {
        self.speech_duration = Some(duration_ms);
        self.speech_confidence = Some(confidence);
        self
    }
}

/// One student utterance as seen by the pipeline.
///
/// `normalized_message` is empty until the gate accepts the turn; after
/// [`Turn::normalized`] the turn is never mutated again.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub session_id: String,
    pub lesson_id: Option<String>,
    pub raw_message: String,
    pub normalized_message: String,
    pub speech_duration_ms: Option<u64>,
    pub speech_confidence: Option<f64>,
    pub energy_level: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a turn from an inbound request, stamped with the current time.
    pub fn from_request(request: TurnRequest) -> Self {
        Self {
            session_id: request.session_id,
            lesson_id: request.lesson_id,
            raw_message: request.message,
            normalized_message: String::new(),
            speech_duration_ms: request.speech_duration,
            speech_confidence: request.speech_confidence,
            energy_level: request.energy_level,
            timestamp: Utc::now(),
        }
    }

    /// Freeze the turn with its normalized text.
    pub fn normalized(self, normalized_message: String) -> Self {
        Self {
            normalized_message,
            ..self
        }
    }
}

/// Outbound result contract returned to the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub content: String,
    pub used_fallback: bool,
    pub used_cache: bool,
    pub breaker_open: bool,
    pub retry_count: u32,
    pub tokens_used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Number of turns that were ahead of this one in its session lane.
    pub queue_depth: usize,
}
