use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::recorder::{ConfirmationError, ConfirmationOutcome, DonationConfirmation, DonationRecorder};
use crate::workflows::responses::{error_response, internal_error, validation_response};

pub fn registry_router(recorder: Arc<DonationRecorder>) -> Router {
    Router::new()
        .route("/api/v1/donations/confirm", post(confirm_handler))
        .with_state(recorder)
}

pub(crate) async fn confirm_handler(
    State(recorder): State<Arc<DonationRecorder>>,
    Json(confirmation): Json<DonationConfirmation>,
) -> Response {
    match recorder.confirm(confirmation) {
        Ok(ConfirmationOutcome::Recorded(record)) => (
            StatusCode::OK,
            Json(json!({ "status": "recorded", "donor": record })),
        )
            .into_response(),
        Ok(ConfirmationOutcome::AlreadyApplied(record)) => (
            StatusCode::OK,
            Json(json!({ "status": "already_applied", "donor": record })),
        )
            .into_response(),
        Ok(ConfirmationOutcome::NotFound(donor_id)) => error_response(
            StatusCode::NOT_FOUND,
            format!("donor {donor_id} not found"),
        ),
        Err(ConfirmationError::Validation(err)) => validation_response(err),
        Err(ConfirmationError::Repository(err)) => {
            error!(error = %err, "failed to persist donation");
            internal_error(err)
        }
    }
}
