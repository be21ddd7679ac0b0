use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::Utc;
use validator::Validate;

use super::error::ApiError;
use crate::forecast::{FeedbackReceipt, ModelStatus, PredictionFeedback, PredictionOutcome, PredictionRequest};
use crate::state::AppState;

/// POST /api/v1/predictions
pub async fn predict(
    State(st): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionOutcome>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;
    let outcome = st.predictions.predict(&req, Utc::now().date_naive())?;
    Ok(Json(outcome))
}

/// GET /api/v1/predictions/model
pub async fn model_status(State(st): State<AppState>) -> Json<ModelStatus> {
    Json(st.predictions.model_status())
}

/// POST /api/v1/predictions/feedback
pub async fn feedback(
    State(st): State<AppState>,
    payload: Result<Json<PredictionFeedback>, JsonRejection>,
) -> Result<Json<FeedbackReceipt>, ApiError> {
    let Json(feedback) = payload?;
    feedback.validate()?;
    Ok(Json(st.predictions.record_feedback(&feedback, Utc::now())))
}
