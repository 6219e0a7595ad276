//! Telemetry buffer access.
//!
//! Endpoints:
//! - GET /api/v1/telemetry?limit=n  - Most recent entries, oldest first
//! - GET /api/v1/telemetry/summary  - Aggregates over the buffer

use axum::extract::{Query, State};
use serde::Deserialize;

use tutorlane_types::telemetry::{TelemetryEntry, TelemetrySummary};

use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<TelemetryQuery>,
) -> ApiResponse<Vec<TelemetryEntry>> {
    let timer = RequestTimer::start();
    timer.finish(state.pipeline.telemetry().get_recent(query.limit))
}

pub async fn summary(State(state): State<AppState>) -> ApiResponse<TelemetrySummary> {
    let timer = RequestTimer::start();
    timer.finish(state.pipeline.telemetry().summary())
}
