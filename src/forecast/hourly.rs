//! Hour-by-hour generation/consumption forecasts.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use rand::Rng;

use super::patterns::HourlyPatterns;
use super::stats::{normal_random, round_to};
use super::weather::WeatherAdjuster;
use crate::domain::{ForecastPoint, WeatherRecord};

/// Consumption never drops below this baseline
pub const MIN_BASELINE_LOAD_KW: f64 = 0.2;
pub const MAX_CONFIDENCE_PCT: u8 = 95;
pub const MIN_CONFIDENCE_PCT: u8 = 50;
const CONFIDENCE_DECAY_PER_DAY: u32 = 5;

/// Confidence for a point `days_ahead` days out (the first forecast day is 1).
pub fn confidence_for_day(days_ahead: u32) -> u8 {
    let decay = days_ahead.saturating_mul(CONFIDENCE_DECAY_PER_DAY);
    let pct = u32::from(MAX_CONFIDENCE_PCT).saturating_sub(decay);
    pct.clamp(u32::from(MIN_CONFIDENCE_PCT), u32::from(MAX_CONFIDENCE_PCT)) as u8
}

/// Local midnight of the current day in `tz`, as UTC, truncated to the UTC hour.
///
/// Zones with a fractional offset (Asia/Kolkata) start at the UTC hour just
/// before local midnight so every timestamp stays on an hour boundary.
pub fn horizon_start(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let midnight = now.with_timezone(&tz).date_naive().and_time(NaiveTime::MIN);
    midnight
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| truncate_to_hour(dt.with_timezone(&Utc)))
        .unwrap_or_else(|| truncate_to_hour(now))
}

fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// `days * 24` hourly timestamps starting at `start`.
pub fn horizon(start: DateTime<Utc>, days: u32) -> impl Iterator<Item = DateTime<Utc>> {
    (0..i64::from(days) * 24).map(move |i| start + Duration::hours(i))
}

#[derive(Debug, Clone, Copy)]
pub struct HourlyForecastGenerator {
    pub adjuster: WeatherAdjuster,
    pub tz: Tz,
}

impl Default for HourlyForecastGenerator {
    fn default() -> Self {
        Self {
            adjuster: WeatherAdjuster::default(),
            tz: Tz::UTC,
        }
    }
}

impl HourlyForecastGenerator {
    pub fn new(adjuster: WeatherAdjuster, tz: Tz) -> Self {
        Self { adjuster, tz }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        patterns: &HourlyPatterns,
        weather: &[WeatherRecord],
        start: DateTime<Utc>,
        days: u32,
        rng: &mut R,
    ) -> Vec<ForecastPoint> {
        let mut out = Vec::with_capacity(days as usize * 24);

        for (index, timestamp) in horizon(start, days).enumerate() {
            let hour = timestamp.with_timezone(&self.tz).hour();
            let pattern = patterns.get(hour);
            let (adjustment, record) = self.adjuster.adjust_at(weather, timestamp);

            let generation = pattern.avg_generation_kw * adjustment.generation_factor()
                + normal_random(rng) * pattern.gen_std_dev;
            let generation = round_to(generation.max(0.0), 2);

            let consumption = pattern.avg_consumption_kw * adjustment.consumption_factor()
                + normal_random(rng) * pattern.con_std_dev;
            let consumption = round_to(consumption.max(MIN_BASELINE_LOAD_KW), 2);

            let days_ahead = (index / 24) as u32 + 1;

            out.push(ForecastPoint {
                timestamp,
                generation_kw: generation,
                consumption_kw: consumption,
                net_energy_kw: round_to(generation - consumption, 2),
                temperature_c: record.map(|r| r.temperature_c),
                cloud_cover_pct: record.map(|r| r.cloud_cover_pct),
                wind_speed: record.map(|r| r.wind_speed),
                condition: record.map(|r| r.condition),
                confidence_pct: confidence_for_day(days_ahead),
            });
        }

        out
    }
}
