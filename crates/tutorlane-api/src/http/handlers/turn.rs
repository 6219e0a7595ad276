//! Turn submission.
//!
//! POST /api/v1/turns - Run one student utterance through the pipeline.

use axum::extract::State;

use tutorlane_types::turn::{TurnRequest, TurnResult};

use crate::http::error::AppError;
use crate::http::extractors::ApiJson;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// POST /api/v1/turns
///
/// A turn superseded by a newer one in the same session answers
/// `409 SUPERSEDED`; only the newest turn's result is meant for playback.
pub async fn submit_turn(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TurnRequest>,
) -> Result<ApiResponse<TurnResult>, AppError> {
    let timer = RequestTimer::start();
    if request.session_id.trim().is_empty() {
        return Err(AppError::Validation("sessionId must not be empty".to_string()));
    }
    if let Some(confidence) = request.speech_confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(AppError::Validation(
                "speechConfidence must be between 0 and 1".to_string(),
            ));
        }
    }

    let result = state.pipeline.process_turn(request).await?;
    Ok(timer.finish(result))
}
