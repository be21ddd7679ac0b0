//! Weather-conditioned adjustment factors.
//!
//! Generation is scaled down by cloud cover and rain; consumption is scaled up
//! as temperature moves away from a 21 °C comfort point.

use chrono::{DateTime, Utc};

use crate::domain::{WeatherCondition, WeatherRecord};

pub const COMFORT_TEMPERATURE_C: f64 = 21.0;
/// Generation lost at 100 % cloud cover
pub const MAX_CLOUD_LOSS: f64 = 0.7;
pub const RAIN_PENALTY: f64 = 0.7;
/// Consumption increase per 10 °C away from the comfort point
pub const TEMPERATURE_SENSITIVITY: f64 = 0.2;

/// Multipliers derived from a single weather record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherAdjustment {
    pub cloud_factor: f64,
    /// `RAIN_PENALTY` when raining, otherwise 1.0
    pub rain_penalty: f64,
    pub temp_factor: f64,
}

impl WeatherAdjustment {
    pub const NEUTRAL: Self = Self {
        cloud_factor: 1.0,
        rain_penalty: 1.0,
        temp_factor: 1.0,
    };

    pub fn generation_factor(&self) -> f64 {
        self.cloud_factor * self.rain_penalty
    }

    pub fn consumption_factor(&self) -> f64 {
        self.temp_factor
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherAdjuster {
    /// Optional ceiling on the temperature factor; `None` keeps it unbounded
    pub max_temp_factor: Option<f64>,
}

impl WeatherAdjuster {
    pub fn new(max_temp_factor: Option<f64>) -> Self {
        Self { max_temp_factor }
    }

    /// Record with the smallest time distance to `at`; the first one wins a tie.
    pub fn nearest<'a>(records: &'a [WeatherRecord], at: DateTime<Utc>) -> Option<&'a WeatherRecord> {
        let mut best: Option<(&WeatherRecord, i64)> = None;
        for record in records {
            let delta = (record.timestamp - at).num_seconds().abs();
            match best {
                Some((_, best_delta)) if delta >= best_delta => {}
                _ => best = Some((record, delta)),
            }
        }
        best.map(|(record, _)| record)
    }

    pub fn adjustment(&self, record: Option<&WeatherRecord>) -> WeatherAdjustment {
        let Some(record) = record else {
            return WeatherAdjustment::NEUTRAL;
        };

        let cloud = record.cloud_cover_pct.clamp(0.0, 100.0);
        // written as (100 - c * 0.7) / 100 so full cover lands on exactly 0.3
        let cloud_factor = (100.0 - cloud * MAX_CLOUD_LOSS) / 100.0;

        let rain_penalty = if record.condition == WeatherCondition::Rain {
            RAIN_PENALTY
        } else {
            1.0
        };

        let deviation = (record.temperature_c - COMFORT_TEMPERATURE_C).abs();
        let mut temp_factor = 1.0 + (deviation / 10.0) * TEMPERATURE_SENSITIVITY;
        if let Some(ceiling) = self.max_temp_factor {
            temp_factor = temp_factor.min(ceiling.max(1.0));
        }

        WeatherAdjustment {
            cloud_factor,
            rain_penalty,
            temp_factor,
        }
    }

    pub fn adjust_at<'a>(
        &self,
        records: &'a [WeatherRecord],
        at: DateTime<Utc>,
    ) -> (WeatherAdjustment, Option<&'a WeatherRecord>) {
        let record = Self::nearest(records, at);
        (self.adjustment(record), record)
    }
}
