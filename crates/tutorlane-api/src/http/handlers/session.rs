//! Session inspection and barge-in.
//!
//! Endpoints:
//! - GET  /api/v1/sessions/{id}        - Session state and lane activity
//! - POST /api/v1/sessions/{id}/cancel - Cancel the running and queued turns

use axum::extract::{Path, State};
use serde::Serialize;

use tutorlane_core::session::{LaneStatus, SessionSnapshot};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub queue_depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<LaneStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResult {
    pub session_id: String,
    pub cancelled: usize,
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<SessionView>, AppError> {
    let timer = RequestTimer::start();
    let lane = state.pipeline.queue().lane_status(&session_id);
    let snapshot = state.pipeline.sessions().snapshot(&session_id);
    if lane.is_none() && snapshot.is_none() {
        return Err(AppError::NotFound(format!("Session '{session_id}' not found")));
    }

    Ok(timer.finish(SessionView {
        queue_depth: state.pipeline.queue().queue_depth(&session_id),
        session_id,
        lane,
        state: snapshot,
    }))
}

/// POST /api/v1/sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResponse<CancelResult> {
    let timer = RequestTimer::start();
    let cancelled = state.pipeline.cancel_session(&session_id);
    if cancelled > 0 {
        tracing::info!(session_id = %session_id, cancelled, "session turns cancelled");
    }
    timer.finish(CancelResult {
        session_id,
        cancelled,
    })
}
