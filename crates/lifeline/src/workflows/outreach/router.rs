use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use super::service::{OutreachError, OutreachOutcome, OutreachRequest, OutreachService};
use super::templates::DEFAULT_URGENCY;
use crate::workflows::registry::domain::Coordinates;
use crate::workflows::responses::{internal_error, validation_response};
use crate::workflows::validation::{parse_blood_group, ValidationError};

pub fn outreach_router(service: Arc<OutreachService>) -> Router {
    Router::new()
        .route("/api/v1/outreach/initiate", post(initiate_handler))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct InitiateOutreachBody {
    pub blood_group: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub urgency_level: Option<u8>,
    pub note: Option<String>,
}

impl InitiateOutreachBody {
    pub fn into_request(self) -> Result<OutreachRequest, ValidationError> {
        let blood_group = parse_blood_group(self.blood_group.as_deref())?;
        let latitude = finite("lat", self.lat)?;
        let longitude = finite("lon", self.lon)?;
        let request = OutreachRequest {
            blood_group,
            location: Coordinates::new(latitude, longitude),
            urgency_level: self.urgency_level.unwrap_or(DEFAULT_URGENCY),
            note: self.note,
        };
        request.validate()?;
        Ok(request)
    }
}

fn finite(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField(field)),
        Some(value) if value.is_finite() => Ok(value),
        Some(value) => Err(ValidationError::InvalidValue {
            field,
            reason: format!("{value} is not a finite number"),
        }),
    }
}

async fn initiate_handler(
    State(service): State<Arc<OutreachService>>,
    Json(body): Json<InitiateOutreachBody>,
) -> Response {
    let request = match body.into_request() {
        Ok(request) => request,
        Err(err) => return validation_response(err),
    };

    match service.initiate(request).await {
        Ok(outcome @ OutreachOutcome::Throttled { retry_after_secs }) => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs.max(0).to_string())],
            Json(outcome),
        )
            .into_response(),
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(OutreachError::Validation(err)) => validation_response(err),
        Err(err @ OutreachError::Matching(_)) => {
            error!(error = %err, "outreach ranking failed");
            internal_error(err)
        }
    }
}
