use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::error;

use super::engine::{BloodRequest, MatchingEngine, OrganRequest};
use super::ranker::DEFAULT_TOP_N;
use super::views::{DonorMatchView, OrganMatchView, RankingResponse};
use crate::workflows::outreach::clock::Clock;
use crate::workflows::responses::{internal_error, validation_response};
use crate::workflows::registry::domain::OrganType;
use crate::workflows::validation::{
    parse_blood_group, parse_coordinates, parse_top_n, require, ValidationError,
};

#[derive(Clone)]
pub struct MatchingState {
    pub engine: Arc<MatchingEngine>,
    pub clock: Arc<dyn Clock>,
}

/// Router exposing the ranking endpoints.
pub fn matching_router(state: MatchingState) -> Router {
    Router::new()
        .route("/api/v1/blood/donors", get(blood_donors_handler))
        .route("/api/v1/organ/matches", get(organ_matches_handler))
        .with_state(state)
}

/// Raw query parameters; validated into a [`BloodRequest`].
#[derive(Debug, Default, Deserialize)]
pub struct BloodDonorQuery {
    pub blood_group: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub date: Option<String>,
    pub top_n: Option<String>,
}

impl BloodDonorQuery {
    pub fn into_request(self, today: NaiveDate) -> Result<BloodRequest, ValidationError> {
        let blood_group = parse_blood_group(self.blood_group.as_deref())?;
        let location = parse_coordinates(self.lat.as_deref(), self.lon.as_deref())?;
        let request_date = match self.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|err| ValidationError::InvalidValue {
                    field: "date",
                    reason: format!("'{raw}' is not YYYY-MM-DD ({err})"),
                })?,
            _ => today,
        };
        let top_n = parse_top_n(self.top_n.as_deref(), DEFAULT_TOP_N)?;

        Ok(BloodRequest {
            blood_group,
            location,
            request_date,
            top_n,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrganMatchQuery {
    pub organ: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub top_n: Option<String>,
}

impl OrganMatchQuery {
    pub fn into_request(
        self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<OrganRequest, ValidationError> {
        let organ = OrganType::from(require("organ", self.organ.as_deref())?);
        let location = parse_coordinates(self.lat.as_deref(), self.lon.as_deref())?;
        let top_n = parse_top_n(self.top_n.as_deref(), DEFAULT_TOP_N)?;
        Ok(OrganRequest {
            organ,
            location,
            now,
            top_n,
        })
    }
}

pub(crate) async fn blood_donors_handler(
    State(state): State<MatchingState>,
    Query(query): Query<BloodDonorQuery>,
) -> Response {
    let request = match query.into_request(state.clock.now().date_naive()) {
        Ok(request) => request,
        Err(err) => return validation_response(err),
    };

    match state.engine.blood_donors(&request) {
        Ok(ranked) => {
            let views = ranked.iter().map(DonorMatchView::from).collect::<Vec<_>>();
            let body = RankingResponse::new(views, || {
                format!("No eligible {} blood donors found.", request.blood_group)
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            error!(error = %err, "blood donor ranking failed");
            internal_error(err)
        }
    }
}

pub(crate) async fn organ_matches_handler(
    State(state): State<MatchingState>,
    Query(query): Query<OrganMatchQuery>,
) -> Response {
    let request = match query.into_request(state.clock.now()) {
        Ok(request) => request,
        Err(err) => return validation_response(err),
    };

    match state.engine.organ_matches(&request) {
        Ok(ranked) => {
            let views = ranked.iter().map(OrganMatchView::from).collect::<Vec<_>>();
            let body = RankingResponse::new(views, || {
                format!(
                    "No eligible organ matches found for {}. Check viability time.",
                    request.organ
                )
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            error!(error = %err, "organ match ranking failed");
            internal_error(err)
        }
    }
}
