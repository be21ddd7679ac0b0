use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::WeatherCondition;

/// Per hour-of-day statistics extracted from recent history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyPattern {
    pub hour: u32,
    pub avg_generation_kw: f64,
    pub gen_std_dev: f64,
    pub avg_consumption_kw: f64,
    pub con_std_dev: f64,
}

/// One hour of forecast output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub generation_kw: f64,
    pub consumption_kw: f64,
    /// Always `generation_kw - consumption_kw`, rounded to two decimals
    pub net_energy_kw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_cover_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<WeatherCondition>,
    /// 50..=95
    pub confidence_pct: u8,
}

/// Row shape of the forecast store, keyed by `(site_id, forecast_time)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub site_id: String,
    pub forecast_time: DateTime<Utc>,
    pub generation_forecast: f64,
    pub consumption_forecast: f64,
    pub temperature: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub wind_speed: Option<f64>,
    pub weather_condition: Option<WeatherCondition>,
    pub confidence: u8,
    pub source: String,
}

impl ForecastRow {
    pub const SOURCE: &'static str = "ai_model";

    pub fn from_point(site_id: &str, point: &ForecastPoint) -> Self {
        Self {
            site_id: site_id.to_string(),
            forecast_time: point.timestamp,
            generation_forecast: point.generation_kw,
            consumption_forecast: point.consumption_kw,
            temperature: point.temperature_c,
            cloud_cover: point.cloud_cover_pct,
            wind_speed: point.wind_speed,
            weather_condition: point.condition,
            confidence: point.confidence_pct,
            source: Self::SOURCE.to_string(),
        }
    }
}

/// Per-day prediction from the trend predictor; unit follows the input series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPrediction {
    /// 1-indexed distance from the latest input day
    pub day_offset: u32,
    pub date: NaiveDate,
    pub predicted_value: f64,
    /// 0.4..=0.95
    pub confidence: f64,
}

/// Ordering of a caller-supplied daily series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// One value per calendar day, ending at `latest_date`.
///
/// Values are held oldest first regardless of the order they were supplied in,
/// so the weekday of every point is known without guessing.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    values: Vec<f64>,
    latest_date: NaiveDate,
}

impl DailySeries {
    pub fn new(mut values: Vec<f64>, order: SeriesOrder, latest_date: NaiveDate) -> Self {
        if order == SeriesOrder::NewestFirst {
            values.reverse();
        }
        Self { values, latest_date }
    }

    /// Values, oldest first
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest_date(&self) -> NaiveDate {
        self.latest_date
    }

    /// Calendar date of the value at `index` (oldest first)
    pub fn date_at(&self, index: usize) -> NaiveDate {
        let age = self.values.len().saturating_sub(index + 1) as u64;
        self.latest_date
            .checked_sub_days(Days::new(age))
            .unwrap_or(self.latest_date)
    }

    pub fn weekday_at(&self, index: usize) -> Weekday {
        self.date_at(index).weekday()
    }

    /// The last `n` values (or all of them), oldest first, as a new series
    pub fn tail(&self, n: usize) -> DailySeries {
        let start = self.values.len().saturating_sub(n);
        DailySeries {
            values: self.values[start..].to_vec(),
            latest_date: self.latest_date,
        }
    }
}

/// Projected grid cost for one local calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCostSummary {
    pub date: NaiveDate,
    pub consumption_kwh: f64,
    pub generation_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    pub import_cost: f64,
    pub export_revenue: f64,
    pub net_cost: f64,
    /// Cost avoided compared to importing all consumption
    pub savings: f64,
    pub self_consumption_pct: f64,
}
