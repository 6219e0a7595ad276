//! Input gate: pass/fail screen applied to raw turns before any expensive work.
//!
//! A turn is accepted when it carries text, or when its speech metadata
//! clears both the duration and the confidence threshold. Accepted text is
//! then normalized and screened for gibberish and repetition against the
//! session's recent inputs. Every call updates the process-wide counters.

pub mod screen;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use tutorlane_types::gate::{
    GateDecision, GateReason, GateThresholds, GatingMetrics, GatingProfile,
};
use tutorlane_types::turn::Turn;

pub use screen::{RecentInputs, normalize_input};

/// Validates and normalizes candidate turns.
#[derive(Debug)]
pub struct InputGate {
    thresholds: RwLock<GateThresholds>,
    total: AtomicU64,
    gated: AtomicU64,
    valid: AtomicU64,
    reasons: Mutex<BTreeMap<GateReason, u64>>,
}

impl InputGate {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self {
            thresholds: RwLock::new(thresholds),
            total: AtomicU64::new(0),
            gated: AtomicU64::new(0),
            valid: AtomicU64::new(0),
            reasons: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_profile(profile: GatingProfile) -> Self {
        Self::new(profile.thresholds())
    }

    pub fn thresholds(&self) -> GateThresholds {
        *self.thresholds.read().expect("gate thresholds lock poisoned")
    }

    pub fn set_thresholds(&self, thresholds: GateThresholds) {
        *self.thresholds.write().expect("gate thresholds lock poisoned") = thresholds;
        tracing::info!(
            min_duration_ms = thresholds.min_duration_ms,
            min_confidence = thresholds.min_confidence,
            "gate thresholds updated"
        );
    }

    pub fn apply_profile(&self, profile: GatingProfile) {
        self.set_thresholds(profile.thresholds());
    }

    /// Screen a turn against the thresholds and the session's recent inputs.
    ///
    /// Non-empty normalized text is recorded into `recent` after the
    /// repetition check, whatever the outcome.
    pub fn validate(&self, turn: &Turn, recent: &mut RecentInputs) -> GateDecision {
        let decision = self.decide(turn, recent);
        self.record(&decision);
        if let Some(reason) = decision.reason {
            tracing::debug!(
                session_id = %turn.session_id,
                reason = %reason,
                "turn gated"
            );
        }
        decision
    }

    fn decide(&self, turn: &Turn, recent: &mut RecentInputs) -> GateDecision {
        let normalized = normalize_input(&turn.raw_message);

        if normalized.is_empty() {
            return match self.speech_rejection(turn) {
                Some(reason) => GateDecision::reject(reason),
                // Speech cleared both thresholds but produced no words.
                None => GateDecision::accept(normalized),
            };
        }

        if screen::is_gibberish(&normalized) {
            recent.record(normalized);
            return GateDecision::reject(GateReason::Gibberish);
        }

        let repeated =
            recent.contains(&normalized) && !screen::is_repeatable_short_answer(&normalized);
        recent.record(normalized.clone());
        if repeated {
            return GateDecision::reject(GateReason::Repetition);
        }

        GateDecision::accept(normalized)
    }

    /// Reason a text-less turn fails the speech thresholds, if it does.
    fn speech_rejection(&self, turn: &Turn) -> Option<GateReason> {
        let thresholds = self.thresholds();
        match (turn.speech_duration_ms, turn.speech_confidence) {
            (None, None) => Some(GateReason::EmptyText),
            (Some(duration), _) if duration < thresholds.min_duration_ms => {
                Some(GateReason::SpeechTooShort)
            }
            (_, Some(confidence)) if confidence < thresholds.min_confidence => {
                Some(GateReason::LowConfidence)
            }
            (Some(_), Some(_)) => None,
            _ => Some(GateReason::InsufficientInput),
        }
    }

    fn record(&self, decision: &GateDecision) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match decision.reason {
            Some(reason) => {
                self.gated.fetch_add(1, Ordering::Relaxed);
                let mut reasons = self.reasons.lock().expect("gate reasons lock poisoned");
                *reasons.entry(reason).or_insert(0) += 1;
            }
            None => {
                self.valid.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn metrics(&self) -> GatingMetrics {
        let total = self.total.load(Ordering::Relaxed);
        let gated = self.gated.load(Ordering::Relaxed);
        let valid = self.valid.load(Ordering::Relaxed);
        let reason_counts = self
            .reasons
            .lock()
            .expect("gate reasons lock poisoned")
            .iter()
            .map(|(reason, count)| (reason.as_str().to_string(), *count))
            .collect();
        let gating_rate_percent = if total == 0 {
            0.0
        } else {
            (gated as f64 / total as f64 * 1000.0).round() / 10.0
        };
        GatingMetrics {
            total,
            gated,
            valid,
            gating_rate_percent,
            reason_counts,
        }
    }
}

impl Default for InputGate {
    fn default() -> Self {
        Self::with_profile(GatingProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorlane_types::turn::TurnRequest;

    fn turn(request: TurnRequest) -> Turn {
        Turn::from_request(request)
    }

    fn speech(duration: Option<u64>, confidence: Option<f64>) -> Turn {
        let mut request = TurnRequest::text("s1", "");
        request.speech_duration = duration;
        request.speech_confidence = confidence;
        turn(request)
    }

    #[test]
    fn short_speech_is_gated_even_with_good_confidence() {
        let gate = InputGate::with_profile(GatingProfile::Conservative);
        let mut recent = RecentInputs::default();
        let decision = gate.validate(&speech(Some(100), Some(0.9)), &mut recent);
        assert!(decision.should_gate());
        assert_eq!(decision.reason, Some(GateReason::SpeechTooShort));
    }

    #[test]
    fn text_less_rejection_reasons() {
        let gate = InputGate::with_profile(GatingProfile::Conservative);
        let mut recent = RecentInputs::default();
        let cases = [
            (speech(None, None), GateReason::EmptyText),
            (speech(Some(500), Some(0.2)), GateReason::LowConfidence),
            (speech(None, Some(0.2)), GateReason::LowConfidence),
            (speech(Some(500), None), GateReason::InsufficientInput),
            (speech(None, Some(0.9)), GateReason::InsufficientInput),
        ];
        for (turn, expected) in cases {
            let decision = gate.validate(&turn, &mut recent);
            assert_eq!(decision.reason, Some(expected), "{turn:?}");
        }
    }

    #[test]
    fn text_less_speech_above_thresholds_is_accepted() {
        let gate = InputGate::with_profile(GatingProfile::Responsive);
        let mut recent = RecentInputs::default();
        let decision = gate.validate(&speech(Some(200), Some(0.4)), &mut recent);
        assert!(decision.valid);
        assert_eq!(decision.normalized_input.as_deref(), Some(""));
        assert!(recent.is_empty());
    }

    #[test]
    fn text_is_normalized() {
        let gate = InputGate::default();
        let mut recent = RecentInputs::default();
        let decision = gate.validate(
            &turn(TurnRequest::text("s1", "  What is   FRACTION??? ")),
            &mut recent,
        );
        assert!(decision.valid);
        assert_eq!(decision.normalized_input.as_deref(), Some("what is fraction"));
    }

    #[test]
    fn gibberish_is_gated() {
        let gate = InputGate::default();
        let mut recent = RecentInputs::default();
        let decision = gate.validate(&turn(TurnRequest::text("s1", "brrr hmmmmmm")), &mut recent);
        assert_eq!(decision.reason, Some(GateReason::Gibberish));
    }

    #[test]
    fn repetition_within_window_is_gated() {
        let gate = InputGate::default();
        let mut recent = RecentInputs::new(5);
        let first = gate.validate(&turn(TurnRequest::text("s1", "tell me a story")), &mut recent);
        assert!(first.valid);
        let again = gate.validate(&turn(TurnRequest::text("s1", "Tell me a story!")), &mut recent);
        assert_eq!(again.reason, Some(GateReason::Repetition));
    }

    #[test]
    fn repetition_ages_out_of_window() {
        let gate = InputGate::default();
        let mut recent = RecentInputs::new(2);
        for text in ["what is a noun", "what is a verb", "what is an adverb"] {
            assert!(gate.validate(&turn(TurnRequest::text("s1", text)), &mut recent).valid);
        }
        let decision = gate.validate(&turn(TurnRequest::text("s1", "what is a noun")), &mut recent);
        assert!(decision.valid);
    }

    #[test]
    fn short_answers_may_repeat() {
        let gate = InputGate::default();
        let mut recent = RecentInputs::default();
        assert!(gate.validate(&turn(TurnRequest::text("s1", "yes")), &mut recent).valid);
        assert!(gate.validate(&turn(TurnRequest::text("s1", "yes")), &mut recent).valid);
        assert!(gate.validate(&turn(TurnRequest::text("s1", "4")), &mut recent).valid);
        assert!(gate.validate(&turn(TurnRequest::text("s1", "4")), &mut recent).valid);
    }

    #[test]
    fn metrics_count_every_call() {
        let gate = InputGate::default();
        let mut recent = RecentInputs::default();
        gate.validate(&speech(None, None), &mut recent);
        gate.validate(&speech(Some(10), Some(0.9)), &mut recent);
        gate.validate(&turn(TurnRequest::text("s1", "hello there")), &mut recent);
        gate.validate(&turn(TurnRequest::text("s1", "what about verbs")), &mut recent);

        let metrics = gate.metrics();
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.gated, 2);
        assert_eq!(metrics.valid, 2);
        assert!((metrics.gating_rate_percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(metrics.reason_counts.get("empty_text"), Some(&1));
        assert_eq!(metrics.reason_counts.get("speech_too_short"), Some(&1));
    }

    #[test]
    fn thresholds_are_mutable_at_runtime() {
        let gate = InputGate::with_profile(GatingProfile::Conservative);
        let mut recent = RecentInputs::default();
        assert!(gate.validate(&speech(Some(200), Some(0.4)), &mut recent).should_gate());
        gate.apply_profile(GatingProfile::Responsive);
        assert_eq!(gate.thresholds().min_duration_ms, 150);
        assert!(gate.validate(&speech(Some(200), Some(0.4)), &mut recent).valid);
        gate.set_thresholds(GateThresholds {
            min_duration_ms: 1000,
            min_confidence: 0.1,
        });
        assert_eq!(
            gate.validate(&speech(Some(200), Some(0.4)), &mut recent).reason,
            Some(GateReason::SpeechTooShort)
        );
    }
}
