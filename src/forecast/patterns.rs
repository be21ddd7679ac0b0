//! Hour-of-day pattern extraction from recent power readings.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

use super::stats::{mean, std_dev, DEFAULT_STD_DEV};
use crate::domain::{DeviceRole, HistoricalReading, HourlyPattern};

pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;
pub const DEFAULT_PEAK_CAPACITY_KW: f64 = 5.0;

/// Exactly 24 patterns, indexed by local hour of day
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyPatterns {
    hours: [HourlyPattern; 24],
}

impl HourlyPatterns {
    pub fn get(&self, hour: u32) -> &HourlyPattern {
        &self.hours[(hour % 24) as usize]
    }

    pub fn as_slice(&self) -> &[HourlyPattern] {
        &self.hours
    }

    pub fn iter(&self) -> impl Iterator<Item = &HourlyPattern> {
        self.hours.iter()
    }
}

/// Groups readings into 24 local-hour buckets per device role.
#[derive(Debug, Clone)]
pub struct HourlyPatternEstimator {
    pub lookback: Duration,
    /// Peak of the fallback generation curve
    pub peak_capacity_kw: f64,
    pub tz: Tz,
}

impl Default for HourlyPatternEstimator {
    fn default() -> Self {
        Self {
            lookback: Duration::days(DEFAULT_LOOKBACK_DAYS),
            peak_capacity_kw: DEFAULT_PEAK_CAPACITY_KW,
            tz: Tz::UTC,
        }
    }
}

impl HourlyPatternEstimator {
    pub fn new(lookback: Duration, peak_capacity_kw: f64, tz: Tz) -> Self {
        Self {
            lookback,
            peak_capacity_kw: peak_capacity_kw.max(0.0),
            tz,
        }
    }

    pub fn estimate(&self, readings: &[HistoricalReading], now: DateTime<Utc>) -> HourlyPatterns {
        let window_start = now - self.lookback;
        let mut generation: [Vec<f64>; 24] = std::array::from_fn(|_| Vec::new());
        let mut consumption: [Vec<f64>; 24] = std::array::from_fn(|_| Vec::new());

        let mut used = 0usize;
        for reading in readings {
            let in_window = (window_start..=now).contains(&reading.timestamp);
            if !in_window || !reading.power_kw.is_finite() {
                continue;
            }
            let hour = reading.timestamp.with_timezone(&self.tz).hour() as usize;
            match reading.device_role {
                DeviceRole::Generation => generation[hour].push(reading.power_kw),
                DeviceRole::Consumption => consumption[hour].push(reading.power_kw),
                DeviceRole::Other => continue,
            }
            used += 1;
        }
        debug!(readings = readings.len(), used, "bucketed readings by hour");

        let hours = std::array::from_fn(|h| {
            let hour = h as u32;
            let (avg_generation_kw, gen_std_dev) = match bucket_stats(&generation[h]) {
                Some(stats) => stats,
                None => (solar_fallback_kw(hour, self.peak_capacity_kw), DEFAULT_STD_DEV),
            };
            let (avg_consumption_kw, con_std_dev) = match bucket_stats(&consumption[h]) {
                Some(stats) => stats,
                None => (residential_fallback_kw(hour), DEFAULT_STD_DEV),
            };
            HourlyPattern {
                hour,
                avg_generation_kw,
                gen_std_dev,
                avg_consumption_kw,
                con_std_dev,
            }
        });

        HourlyPatterns { hours }
    }
}

fn bucket_stats(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let avg = mean(values);
    Some((avg.max(0.0), std_dev(values, avg)))
}

/// Bell curve peaking at local noon, zero outside 06:00..18:00.
pub fn solar_fallback_kw(hour: u32, peak_capacity_kw: f64) -> f64 {
    let distance = (hour as f64 - 12.0).abs();
    let shape = (1.0 - distance / 6.0).max(0.0);
    (shape * shape * peak_capacity_kw).max(0.0)
}

/// Residential load bands: morning peak, evening peak, night low, midday.
pub fn residential_fallback_kw(hour: u32) -> f64 {
    match hour {
        7..=9 => 4.0,
        17..=21 => 5.0,
        23 | 0..=5 => 1.0,
        _ => 2.5,
    }
}
