//! GET /api/v1/metrics - Gate, cache, breaker and lane counters.

use axum::extract::State;

use tutorlane_core::tutor::PipelineMetrics;

use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

pub async fn get_metrics(State(state): State<AppState>) -> ApiResponse<PipelineMetrics> {
    let timer = RequestTimer::start();
    timer.finish(state.pipeline.metrics())
}
