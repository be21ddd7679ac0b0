#![cfg(feature = "db")]
//! Direct Postgres backend over the same tables the PostgREST backend reads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::rows::{DeviceRow, ReadingRow, SiteRow, WeatherRow};
use super::{ConflictPolicy, ForecastStore, TelemetrySource, WeatherQuery};
use crate::domain::{Device, ForecastRow, RawReading, Site, WeatherRecord};

pub struct PgRepo {
    pub pool: PgPool,
}

impl PgRepo {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .context("connecting to Postgres")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl TelemetrySource for PgRepo {
    async fn site(&self, site_id: &str) -> Result<Option<Site>> {
        let row: Option<SiteRow> = sqlx::query_as(
            r#"
            SELECT id::text AS id, name, timezone, lat::float8 AS lat, lng::float8 AS lng
            FROM sites
            WHERE id::text = $1
            "#,
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Site::from))
    }

    async fn devices(&self, site_id: &str) -> Result<Vec<Device>> {
        let rows: Vec<DeviceRow> = sqlx::query_as(
            r#"
            SELECT id::text AS id, site_id::text AS site_id, type, capacity::float8 AS capacity
            FROM devices
            WHERE site_id::text = $1
            "#,
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into_device(site_id)).collect())
    }

    async fn readings(&self, device_ids: &[String], since: DateTime<Utc>) -> Result<Vec<RawReading>> {
        if device_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT device_id::text AS device_id, timestamp, power::float8 AS power
            FROM energy_readings
            WHERE device_id::text = ANY($1) AND timestamp >= $2
            ORDER BY timestamp DESC
            "#,
        )
        .bind(device_ids)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RawReading::from).collect())
    }

    async fn weather(&self, site_id: &str, query: WeatherQuery) -> Result<Vec<WeatherRecord>> {
        let order = if query.forecast { "ASC" } else { "DESC" };
        let sql = format!(
            r#"
            SELECT timestamp,
                   temperature::float8 AS temperature,
                   cloud_cover::float8 AS cloud_cover,
                   wind_speed::float8 AS wind_speed,
                   humidity::float8 AS humidity,
                   precipitation::float8 AS precipitation,
                   forecast, source, weather_condition
            FROM weather_data
            WHERE site_id::text = $1 AND forecast = $2 AND timestamp >= $3
            ORDER BY timestamp {order}
            LIMIT $4
            "#
        );
        let rows: Vec<WeatherRow> = sqlx::query_as(&sql)
            .bind(site_id)
            .bind(query.forecast)
            .bind(query.from)
            .bind(query.limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(WeatherRecord::from).collect())
    }
}

#[async_trait]
impl ForecastStore for PgRepo {
    async fn upsert_forecasts(&self, rows: &[ForecastRow], policy: ConflictPolicy) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let site_ids = rows
            .iter()
            .map(|r| Uuid::parse_str(&r.site_id).with_context(|| format!("site id {} is not a UUID", r.site_id)))
            .collect::<Result<Vec<_>>>()?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO energy_forecasts (site_id, forecast_time, generation_forecast, consumption_forecast, \
             temperature, cloud_cover, wind_speed, weather_condition, confidence, source) ",
        );
        qb.push_values(rows.iter().zip(site_ids), |mut b, (row, site_id)| {
            b.push_bind(site_id)
                .push_bind(row.forecast_time)
                .push_bind(row.generation_forecast)
                .push_bind(row.consumption_forecast)
                .push_bind(row.temperature)
                .push_bind(row.cloud_cover)
                .push_bind(row.wind_speed)
                .push_bind(row.weather_condition.map(|c| c.to_string()))
                .push_bind(i16::from(row.confidence))
                .push_bind(row.source.clone());
        });
        qb.push(" ON CONFLICT (site_id, forecast_time) ");
        qb.push(match policy {
            ConflictPolicy::IgnoreDuplicates => "DO NOTHING",
            ConflictPolicy::Overwrite => {
                "DO UPDATE SET generation_forecast = EXCLUDED.generation_forecast, \
                 consumption_forecast = EXCLUDED.consumption_forecast, \
                 temperature = EXCLUDED.temperature, \
                 cloud_cover = EXCLUDED.cloud_cover, \
                 wind_speed = EXCLUDED.wind_speed, \
                 weather_condition = EXCLUDED.weather_condition, \
                 confidence = EXCLUDED.confidence, \
                 source = EXCLUDED.source"
            }
        });

        qb.build().execute(&self.pool).await?;
        Ok(rows.len())
    }
}
