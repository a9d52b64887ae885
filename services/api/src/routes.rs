use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use scoring_engine::error::AppError;
use scoring_engine::scoring::{
    scoring_router, validate_draft, CreateScoringConfig, RiskAlertPublisher, ScoringRepository,
    ScoringService,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct DraftValidationResponse {
    pub(crate) name: String,
    pub(crate) valid: bool,
    pub(crate) rules: usize,
}

pub(crate) fn with_scoring_routes<R, A>(service: Arc<ScoringService<R, A>>) -> axum::Router
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    scoring_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/scoring/drafts/validation",
            axum::routing::post(draft_validation_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Check an authoring payload without storing it, so editors can show every problem at once.
pub(crate) async fn draft_validation_endpoint(
    Json(payload): Json<CreateScoringConfig>,
) -> Result<Json<DraftValidationResponse>, AppError> {
    let errors = validate_draft(&payload);
    if !errors.is_empty() {
        return Err(AppError::InvalidConfiguration(errors));
    }

    Ok(Json(DraftValidationResponse {
        name: payload.name,
        valid: true,
        rules: payload.rules.len(),
    }))
}
