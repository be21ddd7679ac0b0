use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::forecast::{ForecastEngine, PredictionEngine};
use crate::repo::Repositories;

/// Shared handler state; both engines are stateless between requests.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub forecasts: Arc<ForecastEngine>,
    pub predictions: Arc<PredictionEngine>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let repos = Repositories::new(&cfg).await?;
        Ok(Self::with_repositories(cfg, repos))
    }

    pub fn with_repositories(cfg: Config, repos: Repositories) -> Self {
        let forecasts = ForecastEngine::new(
            repos.telemetry,
            repos.forecasts,
            cfg.forecast.clone(),
            cfg.tariff,
        );
        let predictions = PredictionEngine::new(cfg.prediction.clone());
        Self {
            cfg,
            forecasts: Arc::new(forecasts),
            predictions: Arc::new(predictions),
        }
    }
}
