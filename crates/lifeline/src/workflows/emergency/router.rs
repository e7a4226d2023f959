use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::domain::SosRequest;
use super::service::{SosError, SosService};
use crate::workflows::responses::{error_response, validation_response};

pub fn emergency_router(service: Arc<SosService>) -> Router {
    Router::new()
        .route("/api/v1/emergency/sos", post(trigger_handler))
        .route("/api/v1/emergency/sos/:sos_id", get(status_handler))
        .with_state(service)
}

pub(crate) async fn trigger_handler(
    State(service): State<Arc<SosService>>,
    Json(request): Json<SosRequest>,
) -> Response {
    match service.trigger(request).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(SosError::Validation(err)) => validation_response(err),
    }
}

pub(crate) async fn status_handler(
    State(service): State<Arc<SosService>>,
    Path(sos_id): Path<String>,
) -> Response {
    match service.status(&sos_id) {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("SOS request {sos_id} not found")),
    }
}
