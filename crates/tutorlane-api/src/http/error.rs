//! Application error type mapping to HTTP status codes and envelope format.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tutorlane_core::tutor::TurnError;

#[derive(Debug)]
pub enum AppError {
    Turn(TurnError),
    NotFound(String),
    Validation(String),
    Body(JsonRejection),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        AppError::Turn(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Body(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Turn(TurnError::Superseded) => (
                StatusCode::CONFLICT,
                "SUPERSEDED",
                "Turn was superseded by a newer turn".to_string(),
            ),
            AppError::Turn(TurnError::ShuttingDown) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SHUTTING_DOWN",
                "Server is shutting down".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Body(rejection) => (rejection.status(), "INVALID_BODY", rejection.body_text()),
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
