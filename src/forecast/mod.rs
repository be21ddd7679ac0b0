pub mod costs;
pub mod engine;
pub mod error;
pub mod hourly;
pub mod patterns;
pub mod predictor;
pub mod recommendations;
pub mod seasonal;
pub mod stats;
pub mod synthetic;
pub mod weather;

pub use costs::{daily_costs, Tariff};
pub use engine::{ForecastEngine, ForecastOutcome, ForecastRequest, PersistReport};
pub use error::ForecastError;
pub use hourly::HourlyForecastGenerator;
pub use patterns::{HourlyPatternEstimator, HourlyPatterns};
pub use predictor::{
    EnergyDatum, FeedbackReceipt, ModelStatus, PredictionEngine, PredictionFeedback, PredictionOutcome,
    PredictionRequest,
};
pub use recommendations::RecommendationEngine;
pub use seasonal::SeasonalTrendPredictor;
pub use synthetic::SyntheticWeatherGenerator;
pub use weather::WeatherAdjuster;

use rand::{rngs::StdRng, SeedableRng};

/// Fixed-seed RNG when configured, entropy-seeded otherwise
pub(crate) fn request_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
