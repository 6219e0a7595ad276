//! Runtime gate thresholds.
//!
//! Endpoints:
//! - GET /api/v1/gating - Current thresholds
//! - PUT /api/v1/gating - Apply a profile and/or explicit thresholds

use axum::extract::State;
use serde::Deserialize;

use tutorlane_types::gate::{GateThresholds, GatingProfile};

use crate::http::error::AppError;
use crate::http::extractors::ApiJson;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatingUpdate {
    #[serde(default)]
    pub profile: Option<GatingProfile>,
    #[serde(default)]
    pub min_duration_ms: Option<u64>,
    #[serde(default)]
    pub min_confidence: Option<f64>,
}

pub async fn get_gating(State(state): State<AppState>) -> ApiResponse<GateThresholds> {
    let timer = RequestTimer::start();
    timer.finish(state.pipeline.gate().thresholds())
}

/// PUT /api/v1/gating
///
/// The profile (if any) is applied first; explicit values override it.
pub async fn update_gating(
    State(state): State<AppState>,
    ApiJson(update): ApiJson<GatingUpdate>,
) -> Result<ApiResponse<GateThresholds>, AppError> {
    let timer = RequestTimer::start();
    if let Some(confidence) = update.min_confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(AppError::Validation(
                "minConfidence must be between 0 and 1".to_string(),
            ));
        }
    }

    let gate = state.pipeline.gate();
    let mut thresholds = update
        .profile
        .map(|profile| profile.thresholds())
        .unwrap_or_else(|| gate.thresholds());
    if let Some(ms) = update.min_duration_ms {
        thresholds.min_duration_ms = ms;
    }
    if let Some(confidence) = update.min_confidence {
        thresholds.min_confidence = confidence;
    }
    gate.set_thresholds(thresholds);

    Ok(timer.finish(thresholds))
}
