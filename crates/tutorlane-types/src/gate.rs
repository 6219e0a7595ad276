//! Input gate decisions, thresholds and metrics snapshots.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Why the gate rejected a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    EmptyText,
    SpeechTooShort,
    LowConfidence,
    InsufficientInput,
    Gibberish,
    Repetition,
}

impl GateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateReason::EmptyText => "empty_text",
            GateReason::SpeechTooShort => "speech_too_short",
            GateReason::LowConfidence => "low_confidence",
            GateReason::InsufficientInput => "insufficient_input",
            GateReason::Gibberish => "gibberish",
            GateReason::Repetition => "repetition",
        }
    }
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running a turn through the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<GateReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_input: Option<String>,
}

impl GateDecision {
    pub fn accept(normalized: String) -> Self {
        Self {
            valid: true,
            reason: None,
            normalized_input: Some(normalized),
        }
    }

    pub fn reject(reason: GateReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            normalized_input: None,
        }
    }

    /// Inverse of `valid`, named the way callers branch on it.
    pub fn should_gate(&self) -> bool {
        !self.valid
    }
}

/// Minimum speech duration and recognizer confidence for text-less turns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateThresholds {
    pub min_duration_ms: u64,
    pub min_confidence: f64,
}

/// Named threshold presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatingProfile {
    /// 150 ms / 0.30 -- lets short, quiet answers through.
    Responsive,
    /// 350 ms / 0.50 -- filters more background noise.
    #[default]
    Conservative,
}

impl GatingProfile {
    pub fn thresholds(&self) -> GateThresholds {
        match self {
            GatingProfile::Responsive => GateThresholds {
                min_duration_ms: 150,
                min_confidence: 0.30,
            },
            GatingProfile::Conservative => GateThresholds {
                min_duration_ms: 350,
                min_confidence: 0.50,
            },
        }
    }
}

impl fmt::Display for GatingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatingProfile::Responsive => write!(f, "responsive"),
            GatingProfile::Conservative => write!(f, "conservative"),
        }
    }
}

impl FromStr for GatingProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "responsive" => Ok(GatingProfile::Responsive),
            "conservative" => Ok(GatingProfile::Conservative),
            other => Err(format!("invalid gating profile: '{other}'")),
        }
    }
}

/// Process-wide gate counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatingMetrics {
    pub total: u64,
    pub gated: u64,
    pub valid: u64,
    pub gating_rate_percent: f64,
    pub reason_counts: BTreeMap<String, u64>,
}
