//! Consumption prediction service: daily series in, predictions and advice out.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::error::ForecastError;
use super::recommendations::RecommendationEngine;
use super::request_rng;
use super::seasonal::SeasonalTrendPredictor;
use crate::config::PredictionConfig;
use crate::domain::{DailyPrediction, DailySeries, Recommendation, SeriesOrder};

const METHOD: &str = "seasonal_trend";

/// One daily value, sent either bare or as `{ "value": n }`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnergyDatum {
    Value(f64),
    Object { value: f64 },
}

impl EnergyDatum {
    pub fn value(&self) -> f64 {
        match *self {
            Self::Value(v) | Self::Object { value: v } => v,
        }
    }
}

fn default_prediction_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub energy_data: Vec<EnergyDatum>,
    #[serde(default = "default_prediction_days")]
    #[validate(range(min = 1))]
    pub prediction_days: u32,
    #[serde(default = "default_true")]
    pub include_recommendations: bool,
    #[serde(default)]
    pub order: SeriesOrder,
    /// Calendar date of the newest value; today (UTC) when absent
    #[serde(default)]
    pub latest_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    pub predictions: Vec<DailyPrediction>,
    pub recommendations: Vec<Recommendation>,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub version: String,
    pub status: &'static str,
    pub last_trained: Option<DateTime<Utc>>,
    pub method: &'static str,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PredictionFeedback {
    #[validate(length(min = 1))]
    pub recommendation_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
    pub accepted: bool,
    pub recommendation_id: String,
    pub received_at: DateTime<Utc>,
}

pub struct PredictionEngine {
    cfg: PredictionConfig,
    predictor: SeasonalTrendPredictor,
    recommender: RecommendationEngine,
}

impl PredictionEngine {
    pub fn new(cfg: PredictionConfig) -> Self {
        Self {
            predictor: SeasonalTrendPredictor::new(cfg.min_points),
            recommender: RecommendationEngine::new(cfg.max_recommendations),
            cfg,
        }
    }

    pub fn predict(&self, req: &PredictionRequest, today: NaiveDate) -> Result<PredictionOutcome, ForecastError> {
        if req.prediction_days == 0 || req.prediction_days > self.cfg.max_prediction_days {
            return Err(ForecastError::InvalidInput(format!(
                "predictionDays must be between 1 and {}, got {}",
                self.cfg.max_prediction_days, req.prediction_days
            )));
        }

        let values = req.energy_data.iter().map(EnergyDatum::value).collect();
        let series = DailySeries::new(values, req.order, req.latest_date.unwrap_or(today));

        let mut rng = request_rng(self.cfg.random_seed);
        let predictions = self.predictor.predict(&series, req.prediction_days, &mut rng)?;
        let recommendations = if req.include_recommendations {
            self.recommender.recommend(&series, &predictions)
        } else {
            Vec::new()
        };

        info!(
            points = series.len(),
            days = predictions.len(),
            recommendations = recommendations.len(),
            "consumption predicted"
        );

        Ok(PredictionOutcome {
            predictions,
            recommendations,
            model_version: self.cfg.model_version.clone(),
        })
    }

    pub fn model_status(&self) -> ModelStatus {
        ModelStatus {
            version: self.cfg.model_version.clone(),
            status: "active",
            last_trained: None,
            method: METHOD,
        }
    }

    /// Feedback is logged for offline analysis; nothing is stored.
    pub fn record_feedback(&self, feedback: &PredictionFeedback, now: DateTime<Utc>) -> FeedbackReceipt {
        info!(
            recommendation_id = %feedback.recommendation_id,
            applied_at = ?feedback.applied_at,
            has_notes = feedback.notes.is_some(),
            "recommendation feedback received"
        );
        FeedbackReceipt {
            accepted: true,
            recommendation_id: feedback.recommendation_id.clone(),
            received_at: now,
        }
    }
}
