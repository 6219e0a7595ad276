//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/turns", post(handlers::turn::submit_turn))
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route("/sessions/{id}/cancel", post(handlers::session::cancel_session))
        .route("/answers/check", post(handlers::answer::check))
        .route("/metrics", get(handlers::metrics::get_metrics))
        .route("/telemetry", get(handlers::telemetry::recent))
        .route("/telemetry/summary", get(handlers::telemetry::summary))
        .route(
            "/gating",
            get(handlers::gating::get_gating).put(handlers::gating::update_gating),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness plus the active provider.
async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.pipeline.provider_name().unwrap_or("disabled"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use tutorlane_core::lesson::InMemoryLessonCatalog;
    use tutorlane_core::llm::BoxLlmProvider;
    use tutorlane_core::tutor::TurnPipeline;
    use tutorlane_infra::llm::scripted::ScriptedProvider;
    use tutorlane_types::config::TutorConfig;

    use super::*;

    fn app() -> Router {
        let mut config = TutorConfig::default();
        config.telemetry.debug = true;
        let pipeline = TurnPipeline::new(
            &config,
            Some(BoxLlmProvider::new(ScriptedProvider::new())),
            Arc::new(InMemoryLessonCatalog::new()),
        );
        build_router(AppState::from_parts(pipeline, config))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_provider() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "scripted");
    }

    #[tokio::test]
    async fn turn_round_trip_and_session_view() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/turns",
            Some(json!({"sessionId": "kid-1", "message": "can we do some adding"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let content = body["data"]["content"].as_str().unwrap();
        assert!(content.ends_with('?'));
        assert_eq!(body["data"]["usedFallback"], false);
        assert!(body["meta"]["request_id"].as_str().is_some());

        let (status, body) = send(&app, "GET", "/api/v1/sessions/kid-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"]["recentResponses"][0], content);

        let (_, body) = send(&app, "GET", "/api/v1/telemetry?limit=5", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_session_id_is_rejected() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/turns",
            Some(json!({"sessionId": " ", "message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (status, _) = send(&app(), "GET", "/api/v1/sessions/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn answer_check_endpoint() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/answers/check",
            Some(json!({"answer": "twelve", "expected": "12", "questionType": "math"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isCorrect"], true);
    }

    #[tokio::test]
    async fn unknown_question_type_takes_short_path() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/answers/check",
            Some(json!({"answer": "The Sun", "expected": "the sun", "questionType": "essay"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isCorrect"], true);
        assert_eq!(body["data"]["method"], "exact_match");
    }

    #[tokio::test]
    async fn malformed_body_uses_envelope() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/answers/check",
            Some(json!({"expected": "12"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["data"].is_null());
        assert_eq!(body["errors"][0]["code"], "INVALID_BODY");
    }

    #[tokio::test]
    async fn gating_update_applies_profile_then_overrides() {
        let app = app();
        let (status, body) = send(
            &app,
            "PUT",
            "/api/v1/gating",
            Some(json!({"profile": "responsive", "minConfidence": 0.4})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["minDurationMs"], 150);
        assert_eq!(body["data"]["minConfidence"], 0.4);

        let (status, _) = send(&app, "PUT", "/api/v1/gating", Some(json!({"minConfidence": 2.0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_include_gate_and_breaker() {
        let app = app();
        send(
            &app,
            "POST",
            "/api/v1/turns",
            Some(json!({"sessionId": "s", "message": "", "speechDuration": 20, "speechConfidence": 0.9})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/api/v1/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["gating"]["gated"], 1);
        assert_eq!(body["data"]["breaker"]["state"], "closed");
    }

    #[tokio::test]
    async fn cancel_idle_session_cancels_nothing() {
        let (status, body) = send(&app(), "POST", "/api/v1/sessions/s/cancel", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cancelled"], 0);
    }
}
