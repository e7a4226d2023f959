use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use lifeline::workflows::emergency::emergency_router;
use lifeline::workflows::matching::{matching_router, MatchingState};
use lifeline::workflows::monitor::monitor_router;
use lifeline::workflows::outreach::outreach_router;
use lifeline::workflows::registry::registry_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_workflow_routes(services: &Services) -> axum::Router {
    matching_router(MatchingState {
        engine: Arc::clone(&services.engine),
        clock: Arc::clone(&services.clock),
    })
    .merge(outreach_router(Arc::clone(&services.outreach)))
    .merge(registry_router(Arc::clone(&services.recorder)))
    .merge(emergency_router(Arc::clone(&services.sos)))
    .merge(monitor_router(Arc::clone(&services.monitor)))
    .route("/health", axum::routing::get(healthcheck))
    .route("/ready", axum::routing::get(readiness_endpoint))
    .route("/metrics", axum::routing::get(metrics_endpoint))
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
