use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::validation::ValidationError;

pub(crate) fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    let payload = json!({ "error": message.to_string() });
    (status, Json(payload)).into_response()
}

pub(crate) fn validation_response(err: ValidationError) -> Response {
    error_response(StatusCode::BAD_REQUEST, err)
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
}
