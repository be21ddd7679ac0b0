//! End-to-end forecast runs against the in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;

use der_forecast::config::ForecastConfig;
use der_forecast::domain::{Device, ForecastRow, RawReading, Site};
use der_forecast::forecast::{ForecastEngine, ForecastError, ForecastRequest, Tariff};
use der_forecast::repo::{ConflictPolicy, ForecastStore, InMemoryRepo};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

/// One site with a single load meter reading a flat 2.0 kW for 14 days.
fn flat_load_site(repo: &InMemoryRepo, site_id: &str) {
    repo.insert_site(Site {
        id: site_id.into(),
        name: format!("Flat load {site_id}"),
        timezone: "UTC".into(),
        lat: None,
        lng: None,
    });
    let meter = format!("{site_id}-meter");
    repo.insert_device(Device {
        id: meter.clone(),
        site_id: site_id.into(),
        device_type: "load".into(),
        capacity_kw: 0.0,
    });
    repo.insert_readings((1..=14 * 24).map(|h| RawReading {
        device_id: meter.clone(),
        timestamp: now() - Duration::hours(h),
        power_kw: 2.0,
    }));
}

fn engine(repo: Arc<InMemoryRepo>, seed: u64, policy: ConflictPolicy) -> ForecastEngine {
    let cfg = ForecastConfig {
        random_seed: Some(seed),
        conflict_policy: policy,
        ..ForecastConfig::default()
    };
    ForecastEngine::new(repo.clone(), repo, cfg, Tariff::default())
}

fn request(site_id: &str, days: u32) -> ForecastRequest {
    ForecastRequest {
        site_id: site_id.into(),
        days,
        include_weather: false,
    }
}

#[tokio::test]
async fn flat_load_forecast_tracks_history() {
    let repo = Arc::new(InMemoryRepo::new());
    flat_load_site(&repo, "flat");

    let outcome = engine(repo.clone(), 1, ConflictPolicy::IgnoreDuplicates)
        .forecast_site(&request("flat", 1), now())
        .await
        .unwrap();

    assert_eq!(outcome.forecasts.len(), 24);
    for point in &outcome.forecasts {
        assert_eq!(point.consumption_kw, 2.0);
        assert_eq!(point.confidence_pct, 90);
        assert!(point.generation_kw >= 0.0);
        assert_eq!(
            point.net_energy_kw,
            ((point.generation_kw - point.consumption_kw) * 100.0).round() / 100.0
        );
        assert!(point.temperature_c.is_none());
    }
    assert_eq!(outcome.forecasts[0].timestamp, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
    assert_eq!(outcome.persisted.written, 24);
    assert_eq!(outcome.costs.len(), 1);
    assert_eq!(outcome.costs[0].consumption_kwh, 48.0);
    assert_eq!(repo.stored_forecasts("flat").len(), 24);
}

#[tokio::test]
async fn ignore_duplicates_keeps_first_run() {
    let repo = Arc::new(InMemoryRepo::new());
    flat_load_site(&repo, "flat");

    let first = engine(repo.clone(), 1, ConflictPolicy::IgnoreDuplicates)
        .forecast_site(&request("flat", 1), now())
        .await
        .unwrap();
    engine(repo.clone(), 2, ConflictPolicy::IgnoreDuplicates)
        .forecast_site(&request("flat", 1), now())
        .await
        .unwrap();

    let stored = repo.stored_forecasts("flat");
    assert_eq!(stored.len(), 24);
    let expected: Vec<ForecastRow> = first
        .forecasts
        .iter()
        .map(|p| ForecastRow::from_point("flat", p))
        .collect();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn overwrite_keeps_last_run() {
    let repo = Arc::new(InMemoryRepo::new());
    flat_load_site(&repo, "flat");

    engine(repo.clone(), 1, ConflictPolicy::Overwrite)
        .forecast_site(&request("flat", 1), now())
        .await
        .unwrap();
    let second = engine(repo.clone(), 2, ConflictPolicy::Overwrite)
        .forecast_site(&request("flat", 1), now())
        .await
        .unwrap();

    let stored = repo.stored_forecasts("flat");
    assert_eq!(stored.len(), 24);
    let generation: Vec<f64> = stored.iter().map(|r| r.generation_forecast).collect();
    let expected: Vec<f64> = second.forecasts.iter().map(|p| p.generation_kw).collect();
    assert_eq!(generation, expected);
}

#[tokio::test]
async fn unknown_site_is_reported() {
    let repo = Arc::new(InMemoryRepo::new());
    let err = engine(repo, 1, ConflictPolicy::IgnoreDuplicates)
        .forecast_site(&request("missing", 1), now())
        .await
        .unwrap_err();
    assert!(matches!(err, ForecastError::SiteNotFound(_)));
    assert!(err.is_input_error());
}

struct FailingStore;

#[async_trait]
impl ForecastStore for FailingStore {
    async fn upsert_forecasts(&self, _rows: &[ForecastRow], _policy: ConflictPolicy) -> Result<usize> {
        anyhow::bail!("storage offline")
    }
}

#[tokio::test]
async fn storage_failure_still_returns_forecasts() {
    let repo = Arc::new(InMemoryRepo::new());
    flat_load_site(&repo, "flat");
    let cfg = ForecastConfig {
        random_seed: Some(3),
        ..ForecastConfig::default()
    };
    let engine = ForecastEngine::new(repo, Arc::new(FailingStore), cfg, Tariff::default());

    let outcome = engine.forecast_site(&request("flat", 3), now()).await.unwrap();
    assert_eq!(outcome.forecasts.len(), 72);
    assert_eq!(outcome.persisted.written, 0);
    // 72 rows in batches of 50
    assert_eq!(outcome.persisted.failed_batches, 2);
}

#[tokio::test]
async fn synthetic_weather_fills_the_horizon() {
    let repo = Arc::new(InMemoryRepo::new());
    flat_load_site(&repo, "flat");
    let req = ForecastRequest {
        include_weather: true,
        ..request("flat", 2)
    };

    let outcome = engine(repo, 5, ConflictPolicy::IgnoreDuplicates)
        .forecast_site(&req, now())
        .await
        .unwrap();
    assert_eq!(outcome.forecasts.len(), 48);
    assert!(outcome.forecasts.iter().all(|p| p.cloud_cover_pct.is_some()));
    assert!(outcome.forecasts[24..].iter().all(|p| p.confidence_pct == 85));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sites_do_not_interfere() {
    let repo = Arc::new(InMemoryRepo::new());
    let sites: Vec<String> = (0..8).map(|i| format!("site-{i}")).collect();
    for site in &sites {
        flat_load_site(&repo, site);
    }
    let engine = Arc::new(engine(repo.clone(), 9, ConflictPolicy::IgnoreDuplicates));

    let mut set = JoinSet::new();
    for site in sites.iter().cloned() {
        // each site twice to overlap duplicate writes
        for _ in 0..2 {
            let engine = engine.clone();
            let site = site.clone();
            set.spawn(async move { engine.forecast_site(&request(&site, 2), now()).await });
        }
    }
    while let Some(joined) = set.join_next().await {
        assert_eq!(joined.unwrap().unwrap().forecasts.len(), 48);
    }

    assert_eq!(repo.forecast_count(), sites.len() * 48);
    for site in &sites {
        assert_eq!(repo.stored_forecasts(site).len(), 48);
    }
}
