use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use super::error::ApiError;
use crate::domain::{DailyCostSummary, ForecastPoint};
use crate::forecast::{ForecastRequest, PersistReport};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    pub success: bool,
    pub forecasts: Vec<ForecastPoint>,
    pub message: String,
    pub costs: Vec<DailyCostSummary>,
    pub persisted: PersistReport,
}

/// POST /api/v1/forecasts
pub async fn create_forecast(
    State(st): State<AppState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let outcome = st.forecasts.forecast_site(&req, Utc::now()).await?;
    Ok(Json(ForecastResponse {
        success: true,
        forecasts: outcome.forecasts,
        message: outcome.message,
        costs: outcome.costs,
        persisted: outcome.persisted,
    }))
}
