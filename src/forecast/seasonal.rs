//! Trend + day-of-week predictor over a daily series.

use chrono::{Datelike, Days, NaiveDate};
use rand::Rng;

use super::error::ForecastError;
use super::stats::{coefficient_of_variation, mean, round_to};
use crate::domain::{DailyPrediction, DailySeries};

pub const MIN_POINTS: usize = 7;
/// Number of most recent days the trend and seasonality look at
pub const RECENT_WINDOW: usize = 14;
/// Number of most recent days used for the variance penalty
pub const VARIANCE_WINDOW: usize = 7;
pub const MIN_CONFIDENCE: f64 = 0.4;
pub const MAX_CONFIDENCE: f64 = 0.95;

const NOISE_LOW: f64 = 0.95;
const NOISE_HIGH: f64 = 1.05;
const CV_TOLERANCE: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct SeasonalTrendPredictor {
    pub min_points: usize,
}

impl Default for SeasonalTrendPredictor {
    fn default() -> Self {
        Self { min_points: MIN_POINTS }
    }
}

impl SeasonalTrendPredictor {
    pub fn new(min_points: usize) -> Self {
        Self {
            min_points: min_points.max(2),
        }
    }

    pub fn predict<R: Rng + ?Sized>(
        &self,
        series: &DailySeries,
        days: u32,
        rng: &mut R,
    ) -> Result<Vec<DailyPrediction>, ForecastError> {
        if series.len() < self.min_points {
            return Err(ForecastError::InsufficientData {
                required: self.min_points,
                actual: series.len(),
            });
        }
        if series.values().iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput("energy data contains non-finite values".into()));
        }

        let recent = series.tail(RECENT_WINDOW);
        let avg = mean(recent.values());
        let slope = trend(recent.values());
        let factors = weekday_factors(&recent);

        let mut out = Vec::with_capacity(days as usize);
        for day in 1..=days {
            let date = offset_date(series.latest_date(), day);
            let seasonal = factors[date.weekday().num_days_from_monday() as usize];
            let noise = rng.gen_range(NOISE_LOW..=NOISE_HIGH);
            let value = (avg + slope * f64::from(day)) * seasonal * noise;

            out.push(DailyPrediction {
                day_offset: day,
                date,
                predicted_value: round_to(value, 1),
                confidence: confidence(recent.values(), day),
            });
        }
        Ok(out)
    }
}

fn offset_date(latest: NaiveDate, day: u32) -> NaiveDate {
    latest.checked_add_days(Days::new(u64::from(day))).unwrap_or(latest)
}

/// Average day-to-day change, oldest first.
pub fn trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values.windows(2).map(|w| w[1] - w[0]).sum();
    total / (values.len() - 1) as f64
}

/// Multiplicative factor per weekday, indexed Monday = 0.
///
/// All ones below two full weeks of data; weekdays without data take the
/// overall average.
pub fn weekday_factors(recent: &DailySeries) -> [f64; 7] {
    if recent.len() < RECENT_WINDOW {
        return [1.0; 7];
    }

    let mut groups: [Vec<f64>; 7] = std::array::from_fn(|_| Vec::new());
    for (i, value) in recent.values().iter().enumerate() {
        groups[recent.weekday_at(i).num_days_from_monday() as usize].push(*value);
    }

    let averages: Vec<Option<f64>> = groups
        .iter()
        .map(|g| if g.is_empty() { None } else { Some(mean(g)) })
        .collect();
    let known: Vec<f64> = averages.iter().flatten().copied().collect();
    let overall = mean(&known);
    if overall.abs() < f64::EPSILON {
        return [1.0; 7];
    }

    std::array::from_fn(|d| averages[d].unwrap_or(overall) / overall)
}

/// Confidence for `day` days ahead, penalised by recent volatility.
pub fn confidence(recent: &[f64], day: u32) -> f64 {
    let mut confidence = 0.9 - f64::from(day) * 0.02;

    let start = recent.len().saturating_sub(VARIANCE_WINDOW);
    let cv = coefficient_of_variation(&recent[start..]);
    if cv > CV_TOLERANCE {
        confidence -= (cv - CV_TOLERANCE) * 0.5;
    }

    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
