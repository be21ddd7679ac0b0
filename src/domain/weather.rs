use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Coarse sky condition attached to a weather record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
}

impl WeatherCondition {
    /// Condition implied by cloud cover alone (never `Rain`)
    pub fn from_cloud_cover(cloud_cover_pct: f64) -> Self {
        if cloud_cover_pct > 80.0 {
            Self::Cloudy
        } else if cloud_cover_pct > 50.0 {
            Self::PartlyCloudy
        } else {
            Self::Clear
        }
    }

    /// Condition for stored rows that carry no explicit condition
    pub fn infer(cloud_cover_pct: f64, precipitation_mm: f64) -> Self {
        if precipitation_mm > 0.0 && cloud_cover_pct > 60.0 {
            Self::Rain
        } else {
            Self::from_cloud_cover(cloud_cover_pct)
        }
    }
}

/// Where a weather record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WeatherSource {
    Measured,
    Synthetic,
}

/// A single hourly weather observation or forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    /// 0..=100
    pub cloud_cover_pct: f64,
    pub wind_speed: f64,
    pub humidity_pct: f64,
    pub precipitation_mm: f64,
    pub condition: WeatherCondition,
    pub is_forecast: bool,
    pub source: WeatherSource,
}
