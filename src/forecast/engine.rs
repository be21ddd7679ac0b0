//! Site forecast service: telemetry in, hourly forecast out, rows upserted.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use super::costs::{daily_costs, Tariff};
use super::error::ForecastError;
use super::hourly::{horizon_start, HourlyForecastGenerator};
use super::patterns::HourlyPatternEstimator;
use super::request_rng;
use super::synthetic::SyntheticWeatherGenerator;
use super::weather::WeatherAdjuster;
use crate::config::ForecastConfig;
use crate::domain::{DailyCostSummary, DeviceRole, ForecastPoint, ForecastRow, HistoricalReading, WeatherRecord};
use crate::repo::{ForecastStore, TelemetrySource, WeatherQuery};

fn default_true() -> bool {
    true
}

fn default_days() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    #[validate(length(min = 1))]
    pub site_id: String,
    #[serde(default = "default_days")]
    #[validate(range(min = 1))]
    pub days: u32,
    #[serde(default = "default_true")]
    pub include_weather: bool,
}

/// Outcome of the batched forecast upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistReport {
    pub written: usize,
    pub failed_batches: usize,
}

#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub forecasts: Vec<ForecastPoint>,
    pub costs: Vec<DailyCostSummary>,
    pub persisted: PersistReport,
    pub message: String,
}

pub struct ForecastEngine {
    telemetry: Arc<dyn TelemetrySource>,
    store: Arc<dyn ForecastStore>,
    cfg: ForecastConfig,
    tariff: Tariff,
}

impl ForecastEngine {
    pub fn new(
        telemetry: Arc<dyn TelemetrySource>,
        store: Arc<dyn ForecastStore>,
        cfg: ForecastConfig,
        tariff: Tariff,
    ) -> Self {
        Self {
            telemetry,
            store,
            cfg,
            tariff,
        }
    }

    pub async fn forecast_site(
        &self,
        req: &ForecastRequest,
        now: DateTime<Utc>,
    ) -> Result<ForecastOutcome, ForecastError> {
        if req.days == 0 || req.days > self.cfg.max_days {
            return Err(ForecastError::InvalidInput(format!(
                "days must be between 1 and {}, got {}",
                self.cfg.max_days, req.days
            )));
        }

        let site = self
            .telemetry
            .site(&req.site_id)
            .await
            .map_err(|e| ForecastError::upstream("site", e))?
            .ok_or_else(|| ForecastError::SiteNotFound(req.site_id.clone()))?;
        let tz = site.tz().unwrap_or_else(|| {
            warn!(site_id = %site.id, timezone = %site.timezone, "unknown timezone, using UTC");
            Tz::UTC
        });

        let devices = self
            .telemetry
            .devices(&site.id)
            .await
            .map_err(|e| ForecastError::upstream("devices", e))?;
        let roles: HashMap<&str, DeviceRole> = devices.iter().map(|d| (d.id.as_str(), d.role())).collect();
        let installed_kw: f64 = devices
            .iter()
            .filter(|d| d.role() == DeviceRole::Generation)
            .map(|d| d.capacity_kw.max(0.0))
            .sum();
        let peak_capacity_kw = if installed_kw > 0.0 {
            installed_kw
        } else {
            self.cfg.default_peak_capacity_kw
        };

        let lookback = Duration::days(self.cfg.lookback_days);
        let since = now - lookback;
        let device_ids: Vec<String> = devices.iter().map(|d| d.id.clone()).collect();
        let readings: Vec<HistoricalReading> = self
            .telemetry
            .readings(&device_ids, since)
            .await
            .map_err(|e| ForecastError::upstream("historical readings", e))?
            .into_iter()
            .filter_map(|r| {
                roles.get(r.device_id.as_str()).map(|role| HistoricalReading {
                    device_role: *role,
                    device_id: r.device_id,
                    timestamp: r.timestamp,
                    power_kw: r.power_kw,
                })
            })
            .collect();

        let history = self
            .telemetry
            .weather(
                &site.id,
                WeatherQuery {
                    forecast: false,
                    from: since,
                    limit: None,
                },
            )
            .await
            .map_err(|e| ForecastError::upstream("weather history", e))?;
        debug!(
            site_id = %site.id,
            devices = devices.len(),
            readings = readings.len(),
            weather_history = history.len(),
            "inputs loaded"
        );

        let start = horizon_start(now, tz);
        let hours = req.days as usize * 24;
        let mut rng = request_rng(self.cfg.random_seed);

        let weather: Vec<WeatherRecord> = if req.include_weather {
            let stored = self
                .telemetry
                .weather(
                    &site.id,
                    WeatherQuery {
                        forecast: true,
                        from: start,
                        limit: Some(hours),
                    },
                )
                .await
                .map_err(|e| ForecastError::upstream("weather forecast", e))?;
            if stored.is_empty() {
                info!(site_id = %site.id, hours, "no stored weather forecast, synthesizing");
                SyntheticWeatherGenerator::new(tz).generate(start, hours, &mut rng)
            } else {
                stored
            }
        } else {
            Vec::new()
        };

        let patterns = HourlyPatternEstimator::new(lookback, peak_capacity_kw, tz).estimate(&readings, now);
        let generator = HourlyForecastGenerator::new(WeatherAdjuster::new(self.cfg.max_temp_factor), tz);
        let forecasts = generator.generate(&patterns, &weather, start, req.days, &mut rng);

        let persisted = self.persist(&site.id, &forecasts).await;
        let costs = daily_costs(&forecasts, &self.tariff, tz);

        info!(
            site_id = %site.id,
            points = forecasts.len(),
            written = persisted.written,
            failed_batches = persisted.failed_batches,
            "forecast generated"
        );

        Ok(ForecastOutcome {
            message: format!("Generated {} hourly forecasts for {} days", forecasts.len(), req.days),
            forecasts,
            costs,
            persisted,
        })
    }

    /// Failed batches are logged and skipped; the rest are still written.
    async fn persist(&self, site_id: &str, points: &[ForecastPoint]) -> PersistReport {
        let rows: Vec<ForecastRow> = points.iter().map(|p| ForecastRow::from_point(site_id, p)).collect();
        let mut report = PersistReport::default();

        for (batch, chunk) in rows.chunks(self.cfg.upsert_batch_size.max(1)).enumerate() {
            match self.store.upsert_forecasts(chunk, self.cfg.conflict_policy).await {
                Ok(n) => report.written += n,
                Err(source) => {
                    let err = ForecastError::PersistenceWrite { batch, source };
                    warn!(site_id, rows = chunk.len(), error = %err, "forecast batch not stored");
                    report.failed_batches += 1;
                }
            }
        }
        report
    }
}
