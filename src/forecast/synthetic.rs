//! Plausible hourly weather used when no stored forecast exists.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::f64::consts::PI;

use super::stats::round_to;
use crate::domain::{WeatherCondition, WeatherRecord, WeatherSource};

/// Chance of rain for an hour with more than 60 % cloud cover
pub const RAIN_PROBABILITY: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct SyntheticWeatherGenerator {
    pub tz: Tz,
}

impl Default for SyntheticWeatherGenerator {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl SyntheticWeatherGenerator {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// One record per hour starting at `start`.
    pub fn generate<R: Rng + ?Sized>(&self, start: DateTime<Utc>, hours: usize, rng: &mut R) -> Vec<WeatherRecord> {
        (0..hours)
            .map(|i| {
                let timestamp = start + Duration::hours(i as i64);
                let hour = timestamp.with_timezone(&self.tz).hour();
                self.record_for(timestamp, hour, rng)
            })
            .collect()
    }

    fn record_for<R: Rng + ?Sized>(&self, timestamp: DateTime<Utc>, hour: u32, rng: &mut R) -> WeatherRecord {
        let h = hour as f64;

        let temperature = 15.0 + 10.0 * ((h - 6.0) * PI / 12.0).sin() + rng.gen_range(-2.0..=2.0);

        let cloud = 30.0 + 40.0 * ((h - 10.0) * PI / 12.0).sin() + rng.gen_range(-15.0..=15.0);
        let cloud = cloud.clamp(0.0, 100.0);

        let wind = 2.0 + 3.0 * ((h - 8.0) * PI / 12.0).sin() + rng.gen_range(-1.0..=1.0);
        let wind = wind.max(0.0);

        let rain_roll = rng.gen::<f64>();
        let condition = if cloud > 60.0 && rain_roll < RAIN_PROBABILITY {
            WeatherCondition::Rain
        } else {
            WeatherCondition::from_cloud_cover(cloud)
        };

        let humidity = 60.0 + rng.gen_range(0.0..30.0);
        let precipitation = if condition == WeatherCondition::Rain {
            round_to(rng.gen_range(0.0..5.0), 1)
        } else {
            0.0
        };

        WeatherRecord {
            timestamp,
            temperature_c: round_to(temperature, 1),
            cloud_cover_pct: round_to(cloud, 1),
            wind_speed: round_to(wind, 1),
            humidity_pct: round_to(humidity, 1),
            precipitation_mm: precipitation,
            condition,
            is_forecast: true,
            source: WeatherSource::Synthetic,
        }
    }
}
