//! Persistence boundary: telemetry reads and idempotent forecast writes.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::domain::{Device, ForecastRow, RawReading, Site, WeatherRecord};

pub mod memory;
pub mod postgrest;
mod rows;

#[cfg(feature = "db")]
pub mod pg;

pub use memory::InMemoryRepo;
pub use postgrest::PostgrestRepo;

/// What happens when a row with the same `(site_id, forecast_time)` exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the stored row
    #[default]
    IgnoreDuplicates,
    /// Replace the stored row with the new one
    Overwrite,
}

/// Filter for weather rows of one site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherQuery {
    /// `true` for forecast rows, `false` for measured history
    pub forecast: bool,
    pub from: DateTime<Utc>,
    pub limit: Option<usize>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn site(&self, site_id: &str) -> Result<Option<Site>>;

    async fn devices(&self, site_id: &str) -> Result<Vec<Device>>;

    /// Readings of the given devices at or after `since`, newest first
    async fn readings(&self, device_ids: &[String], since: DateTime<Utc>) -> Result<Vec<RawReading>>;

    /// Weather rows ordered by time, ascending for forecasts and descending for history
    async fn weather(&self, site_id: &str, query: WeatherQuery) -> Result<Vec<WeatherRecord>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Insert-or-resolve rows keyed by `(site_id, forecast_time)`; returns rows sent
    async fn upsert_forecasts(&self, rows: &[ForecastRow], policy: ConflictPolicy) -> Result<usize>;
}

pub struct Repositories {
    pub telemetry: Arc<dyn TelemetrySource>,
    pub forecasts: Arc<dyn ForecastStore>,
}

impl Repositories {
    pub async fn new(cfg: &Config) -> Result<Self> {
        match cfg.store.backend {
            StoreBackend::Memory => {
                let repo = Arc::new(InMemoryRepo::new());
                if cfg.store.seed_demo_site {
                    repo.seed_demo_site(memory::DEMO_SITE_ID, Utc::now());
                    info!(site_id = memory::DEMO_SITE_ID, "seeded in-memory demo site");
                }
                Ok(Self {
                    telemetry: repo.clone(),
                    forecasts: repo,
                })
            }
            StoreBackend::Postgrest => {
                let repo = Arc::new(PostgrestRepo::new(
                    &cfg.store.url,
                    &cfg.store.service_key,
                    std::time::Duration::from_secs(cfg.store.http_timeout_secs),
                )?);
                info!(url = %cfg.store.url, "using PostgREST store");
                Ok(Self {
                    telemetry: repo.clone(),
                    forecasts: repo,
                })
            }
            #[cfg(feature = "db")]
            StoreBackend::Postgres => {
                let repo = Arc::new(pg::PgRepo::connect(&cfg.store.url).await?);
                info!("using Postgres store");
                Ok(Self {
                    telemetry: repo.clone(),
                    forecasts: repo,
                })
            }
            #[cfg(not(feature = "db"))]
            StoreBackend::Postgres => {
                anyhow::bail!("store backend 'postgres' requires building with the `db` feature")
            }
        }
    }
}
