//! Stored row shapes shared by the remote backends.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{Device, RawReading, Site, WeatherCondition, WeatherRecord, WeatherSource};

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub(crate) struct SiteRow {
    pub id: String,
    pub name: String,
    pub timezone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl From<SiteRow> for Site {
    fn from(r: SiteRow) -> Self {
        Site {
            id: r.id,
            name: r.name,
            timezone: r.timezone.unwrap_or_else(|| "UTC".to_string()),
            lat: r.lat,
            lng: r.lng,
        }
    }
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub(crate) struct DeviceRow {
    pub id: String,
    pub site_id: Option<String>,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "db", sqlx(rename = "type"))]
    pub device_type: String,
    pub capacity: Option<f64>,
}

impl DeviceRow {
    pub fn into_device(self, site_id: &str) -> Device {
        Device {
            id: self.id,
            site_id: self.site_id.unwrap_or_else(|| site_id.to_string()),
            device_type: self.device_type,
            capacity_kw: self.capacity.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub(crate) struct ReadingRow {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub power: f64,
}

impl From<ReadingRow> for RawReading {
    fn from(r: ReadingRow) -> Self {
        RawReading {
            device_id: r.device_id,
            timestamp: r.timestamp,
            power_kw: r.power,
        }
    }
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub(crate) struct WeatherRow {
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub forecast: bool,
    pub source: Option<String>,
    pub weather_condition: Option<String>,
}

impl From<WeatherRow> for WeatherRecord {
    fn from(r: WeatherRow) -> Self {
        let cloud_cover_pct = r.cloud_cover.unwrap_or(50.0).clamp(0.0, 100.0);
        let precipitation_mm = r.precipitation.unwrap_or(0.0);
        let condition = r
            .weather_condition
            .as_deref()
            .and_then(|c| c.parse::<WeatherCondition>().ok())
            .unwrap_or_else(|| WeatherCondition::infer(cloud_cover_pct, precipitation_mm));
        WeatherRecord {
            timestamp: r.timestamp,
            temperature_c: r.temperature.unwrap_or(15.0),
            cloud_cover_pct,
            wind_speed: r.wind_speed.unwrap_or(3.0),
            humidity_pct: r.humidity.unwrap_or(70.0),
            precipitation_mm,
            condition,
            is_forecast: r.forecast,
            source: match r.source.as_deref() {
                Some("synthetic") => WeatherSource::Synthetic,
                _ => WeatherSource::Measured,
            },
        }
    }
}
