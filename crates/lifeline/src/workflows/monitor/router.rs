use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::service::{InventoryLevel, ShortageMonitor};
use crate::workflows::responses::validation_response;
use crate::workflows::validation::{parse_blood_group, ValidationError};

pub fn monitor_router(monitor: Arc<ShortageMonitor>) -> Router {
    Router::new()
        .route("/api/v1/monitor/cycle", post(cycle_handler))
        .with_state(monitor)
}

#[derive(Debug, Deserialize)]
pub struct InventoryLevelBody {
    pub blood_group: Option<String>,
    pub units: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MonitorCycleBody {
    #[serde(default)]
    pub levels: Vec<InventoryLevelBody>,
}

impl MonitorCycleBody {
    pub fn into_levels(self) -> Result<Vec<InventoryLevel>, ValidationError> {
        self.levels
            .into_iter()
            .map(|level| {
                let blood_group = parse_blood_group(level.blood_group.as_deref())?;
                let units = level.units.ok_or(ValidationError::MissingField("units"))?;
                let units = u32::try_from(units).map_err(|_| ValidationError::InvalidValue {
                    field: "units",
                    reason: format!("{units} is not a non-negative unit count"),
                })?;
                Ok(InventoryLevel { blood_group, units })
            })
            .collect()
    }
}

async fn cycle_handler(
    State(monitor): State<Arc<ShortageMonitor>>,
    Json(body): Json<MonitorCycleBody>,
) -> Response {
    let levels = match body.into_levels() {
        Ok(levels) => levels,
        Err(err) => return validation_response(err),
    };
    let report = monitor.run_cycle(&levels).await;
    (StatusCode::OK, Json(report)).into_response()
}
