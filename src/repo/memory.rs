//! In-process store, used by the default build and the test suite.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use super::{ConflictPolicy, ForecastStore, TelemetrySource, WeatherQuery};
use crate::domain::{
    Device, ForecastRow, RawReading, Site, WeatherCondition, WeatherRecord, WeatherSource,
};

pub const DEMO_SITE_ID: &str = "demo";

#[derive(Default)]
pub struct InMemoryRepo {
    sites: RwLock<HashMap<String, Site>>,
    devices: RwLock<Vec<Device>>,
    readings: RwLock<Vec<RawReading>>,
    weather: RwLock<Vec<(String, WeatherRecord)>>,
    forecasts: RwLock<BTreeMap<(String, DateTime<Utc>), ForecastRow>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_site(&self, site: Site) {
        self.sites.write().insert(site.id.clone(), site);
    }

    pub fn insert_device(&self, device: Device) {
        self.devices.write().push(device);
    }

    pub fn insert_readings(&self, readings: impl IntoIterator<Item = RawReading>) {
        self.readings.write().extend(readings);
    }

    pub fn insert_weather(&self, site_id: &str, records: impl IntoIterator<Item = WeatherRecord>) {
        self.weather
            .write()
            .extend(records.into_iter().map(|r| (site_id.to_string(), r)));
    }

    /// Stored forecast rows of a site, ordered by forecast time
    pub fn stored_forecasts(&self, site_id: &str) -> Vec<ForecastRow> {
        self.forecasts
            .read()
            .iter()
            .filter(|((site, _), _)| site == site_id)
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn forecast_count(&self) -> usize {
        self.forecasts.read().len()
    }

    /// A small residential site with 30 days of hourly PV and load history.
    pub fn seed_demo_site(&self, site_id: &str, now: DateTime<Utc>) {
        self.insert_site(Site {
            id: site_id.to_string(),
            name: "Demo household".into(),
            timezone: "UTC".into(),
            lat: Some(59.33),
            lng: Some(18.07),
        });
        let pv = Device {
            id: format!("{site_id}-pv"),
            site_id: site_id.to_string(),
            device_type: "solar".into(),
            capacity_kw: 6.0,
        };
        let home = Device {
            id: format!("{site_id}-home"),
            site_id: site_id.to_string(),
            device_type: "load".into(),
            capacity_kw: 0.0,
        };

        let end = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
        let mut readings = Vec::with_capacity(30 * 24 * 2);
        let mut weather = Vec::with_capacity(30 * 24);
        for i in 1..=(30 * 24) {
            let ts = end - Duration::hours(i);
            let hh = ts.hour() as f64;
            // deterministic day-to-day wobble
            let cloud = 35.0 + 30.0 * ((i as f64) / 37.0).sin();

            let clear_sky = ((hh - 6.0) / 12.0 * std::f64::consts::PI).sin().max(0.0);
            let pv_kw = pv.capacity_kw * clear_sky * (1.0 - cloud / 100.0 * 0.7);
            let load_kw = 0.6 + bump(hh, 7.5, 1.5) * 1.0 + bump(hh, 18.5, 2.0) * 1.6;

            readings.push(RawReading {
                device_id: pv.id.clone(),
                timestamp: ts,
                power_kw: pv_kw,
            });
            readings.push(RawReading {
                device_id: home.id.clone(),
                timestamp: ts,
                power_kw: load_kw,
            });
            weather.push(WeatherRecord {
                timestamp: ts,
                temperature_c: 15.0 + 8.0 * ((hh - 9.0) / 12.0 * std::f64::consts::PI).sin(),
                cloud_cover_pct: cloud,
                wind_speed: 3.0,
                humidity_pct: 70.0,
                precipitation_mm: 0.0,
                condition: WeatherCondition::from_cloud_cover(cloud),
                is_forecast: false,
                source: WeatherSource::Measured,
            });
        }

        self.insert_device(pv);
        self.insert_device(home);
        self.insert_readings(readings);
        self.insert_weather(site_id, weather);
    }
}

fn bump(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma.max(0.01);
    (-0.5 * z * z).exp()
}

#[async_trait]
impl TelemetrySource for InMemoryRepo {
    async fn site(&self, site_id: &str) -> Result<Option<Site>> {
        Ok(self.sites.read().get(site_id).cloned())
    }

    async fn devices(&self, site_id: &str) -> Result<Vec<Device>> {
        Ok(self
            .devices
            .read()
            .iter()
            .filter(|d| d.site_id == site_id)
            .cloned()
            .collect())
    }

    async fn readings(&self, device_ids: &[String], since: DateTime<Utc>) -> Result<Vec<RawReading>> {
        let mut out: Vec<RawReading> = self
            .readings
            .read()
            .iter()
            .filter(|r| r.timestamp >= since && device_ids.contains(&r.device_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    async fn weather(&self, site_id: &str, query: WeatherQuery) -> Result<Vec<WeatherRecord>> {
        let mut out: Vec<WeatherRecord> = self
            .weather
            .read()
            .iter()
            .filter(|(site, r)| site == site_id && r.is_forecast == query.forecast && r.timestamp >= query.from)
            .map(|(_, r)| r.clone())
            .collect();
        if query.forecast {
            out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        } else {
            out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

#[async_trait]
impl ForecastStore for InMemoryRepo {
    async fn upsert_forecasts(&self, rows: &[ForecastRow], policy: ConflictPolicy) -> Result<usize> {
        let mut store = self.forecasts.write();
        for row in rows {
            let key = (row.site_id.clone(), row.forecast_time);
            match policy {
                ConflictPolicy::IgnoreDuplicates => {
                    store.entry(key).or_insert_with(|| row.clone());
                }
                ConflictPolicy::Overwrite => {
                    store.insert(key, row.clone());
                }
            }
        }
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(site: &str, ts: DateTime<Utc>, generation: f64) -> ForecastRow {
        ForecastRow {
            site_id: site.into(),
            forecast_time: ts,
            generation_forecast: generation,
            consumption_forecast: 1.0,
            temperature: None,
            cloud_cover: None,
            wind_speed: None,
            weather_condition: None,
            confidence: 90,
            source: ForecastRow::SOURCE.into(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_ignore_keeps_first() {
        let repo = InMemoryRepo::new();
        repo.upsert_forecasts(&[row("s", t0(), 1.0)], ConflictPolicy::IgnoreDuplicates).await.unwrap();
        repo.upsert_forecasts(&[row("s", t0(), 2.0)], ConflictPolicy::IgnoreDuplicates).await.unwrap();

        let stored = repo.stored_forecasts("s");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].generation_forecast, 1.0);
    }

    #[tokio::test]
    async fn test_upsert_overwrite_keeps_last() {
        let repo = InMemoryRepo::new();
        repo.upsert_forecasts(&[row("s", t0(), 1.0)], ConflictPolicy::Overwrite).await.unwrap();
        repo.upsert_forecasts(&[row("s", t0(), 2.0)], ConflictPolicy::Overwrite).await.unwrap();

        let stored = repo.stored_forecasts("s");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].generation_forecast, 2.0);
    }

    #[tokio::test]
    async fn test_sites_keyed_separately() {
        let repo = InMemoryRepo::new();
        repo.upsert_forecasts(&[row("a", t0(), 1.0), row("b", t0(), 1.0)], ConflictPolicy::IgnoreDuplicates)
            .await
            .unwrap();
        assert_eq!(repo.forecast_count(), 2);
        assert_eq!(repo.stored_forecasts("a").len(), 1);
    }

    #[tokio::test]
    async fn test_demo_site_seeded() {
        let repo = InMemoryRepo::new();
        repo.seed_demo_site(DEMO_SITE_ID, t0());

        let site = repo.site(DEMO_SITE_ID).await.unwrap().unwrap();
        assert_eq!(site.timezone, "UTC");
        let devices = repo.devices(DEMO_SITE_ID).await.unwrap();
        assert_eq!(devices.len(), 2);

        let ids: Vec<String> = devices.iter().map(|d| d.id.clone()).collect();
        let readings = repo.readings(&ids, t0() - Duration::days(30)).await.unwrap();
        assert_eq!(readings.len(), 30 * 24 * 2);
        assert!(readings.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert!(readings.iter().all(|r| r.power_kw >= 0.0));

        let history = repo
            .weather(DEMO_SITE_ID, WeatherQuery { forecast: false, from: t0() - Duration::days(30), limit: None })
            .await
            .unwrap();
        assert_eq!(history.len(), 30 * 24);
    }

    #[tokio::test]
    async fn test_weather_query_filters_and_limits() {
        let repo = InMemoryRepo::new();
        let record = |ts: DateTime<Utc>, forecast: bool| WeatherRecord {
            timestamp: ts,
            temperature_c: 20.0,
            cloud_cover_pct: 10.0,
            wind_speed: 1.0,
            humidity_pct: 50.0,
            precipitation_mm: 0.0,
            condition: WeatherCondition::Clear,
            is_forecast: forecast,
            source: WeatherSource::Measured,
        };
        repo.insert_weather(
            "s",
            vec![
                record(t0() + Duration::hours(2), true),
                record(t0() + Duration::hours(1), true),
                record(t0() - Duration::hours(1), true),
                record(t0(), false),
            ],
        );

        let forecast = repo
            .weather("s", WeatherQuery { forecast: true, from: t0(), limit: Some(1) })
            .await
            .unwrap();
        assert_eq!(forecast.len(), 1);
        assert_eq!(forecast[0].timestamp, t0() + Duration::hours(1));
    }
}
