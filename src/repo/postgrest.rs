//! Hosted backend reached through its PostgREST interface.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::rows::{DeviceRow, ReadingRow, SiteRow, WeatherRow};
use super::{ConflictPolicy, ForecastStore, TelemetrySource, WeatherQuery};
use crate::domain::{Device, ForecastRow, RawReading, Site, WeatherRecord};

const FORECAST_TABLE: &str = "energy_forecasts";
const FORECAST_CONFLICT_KEY: &str = "site_id,forecast_time";

#[derive(Clone)]
pub struct PostgrestRepo {
    client: reqwest::Client,
    base_url: String,
}

impl PostgrestRepo {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("der-forecast/0.3"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(service_key).context("service key is not a valid header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {service_key}"))
                .context("service key is not a valid header value")?,
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let resp = self
            .client
            .get(self.table_url(table))
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {table} failed"))?;
        let status = resp.status();
        let body = resp.text().await.with_context(|| format!("reading {table} response failed"))?;
        if !status.is_success() {
            anyhow::bail!("{table} query error: HTTP {status}: {body}");
        }
        let rows: Vec<T> = serde_json::from_str(&body).with_context(|| format!("{table} JSON parse failed"))?;
        debug!(table, rows = rows.len(), "fetched rows");
        Ok(rows)
    }
}

fn timestamp_param(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl TelemetrySource for PostgrestRepo {
    async fn site(&self, site_id: &str) -> Result<Option<Site>> {
        let rows: Vec<SiteRow> = self
            .select(
                "sites",
                &[
                    ("select", "id,name,timezone,lat,lng".to_string()),
                    ("id", format!("eq.{site_id}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(Site::from))
    }

    async fn devices(&self, site_id: &str) -> Result<Vec<Device>> {
        let rows: Vec<DeviceRow> = self
            .select(
                "devices",
                &[
                    ("select", "id,site_id,type,capacity".to_string()),
                    ("site_id", format!("eq.{site_id}")),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.into_device(site_id)).collect())
    }

    async fn readings(&self, device_ids: &[String], since: DateTime<Utc>) -> Result<Vec<RawReading>> {
        if device_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ReadingRow> = self
            .select(
                "energy_readings",
                &[
                    ("select", "device_id,timestamp,power".to_string()),
                    ("device_id", format!("in.({})", device_ids.join(","))),
                    ("timestamp", format!("gte.{}", timestamp_param(since))),
                    ("order", "timestamp.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(RawReading::from).collect())
    }

    async fn weather(&self, site_id: &str, query: WeatherQuery) -> Result<Vec<WeatherRecord>> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("site_id", format!("eq.{site_id}")),
            ("forecast", format!("eq.{}", query.forecast)),
            ("timestamp", format!("gte.{}", timestamp_param(query.from))),
            (
                "order",
                if query.forecast { "timestamp.asc" } else { "timestamp.desc" }.to_string(),
            ),
        ];
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        let rows: Vec<WeatherRow> = self.select("weather_data", &params).await?;
        Ok(rows.into_iter().map(WeatherRecord::from).collect())
    }
}

#[async_trait]
impl ForecastStore for PostgrestRepo {
    async fn upsert_forecasts(&self, rows: &[ForecastRow], policy: ConflictPolicy) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let resolution = match policy {
            ConflictPolicy::IgnoreDuplicates => "resolution=ignore-duplicates,return=minimal",
            ConflictPolicy::Overwrite => "resolution=merge-duplicates,return=minimal",
        };
        let resp = self
            .client
            .post(self.table_url(FORECAST_TABLE))
            .query(&[("on_conflict", FORECAST_CONFLICT_KEY)])
            .header("Prefer", resolution)
            .json(rows)
            .send()
            .await
            .context("forecast upsert failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("forecast upsert error: HTTP {status}: {body}");
        }
        Ok(rows.len())
    }
}
