use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::forecast::Tariff;
use crate::repo::ConflictPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub forecast: ForecastConfig,
    pub prediction: PredictionConfig,
    pub tariff: Tariff,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
    /// JSON log lines; plain text otherwise
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            enable_cors: true,
            request_timeout_secs: 30,
            log_json: true,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub lookback_days: i64,
    pub default_peak_capacity_kw: f64,
    pub max_days: u32,
    pub upsert_batch_size: usize,
    pub conflict_policy: ConflictPolicy,
    /// Ceiling for the temperature consumption factor; unset means unbounded
    pub max_temp_factor: Option<f64>,
    /// Seed every request's RNG with this value for reproducible output
    pub random_seed: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            default_peak_capacity_kw: 5.0,
            max_days: 14,
            upsert_batch_size: 50,
            conflict_policy: ConflictPolicy::IgnoreDuplicates,
            max_temp_factor: None,
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub model_version: String,
    pub min_points: usize,
    pub max_prediction_days: u32,
    pub max_recommendations: usize,
    pub random_seed: Option<u64>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            model_version: "1.2.0".into(),
            min_points: 7,
            max_prediction_days: 30,
            max_recommendations: 5,
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgrest,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// PostgREST base URL or Postgres connection string
    pub url: String,
    pub service_key: String,
    pub http_timeout_secs: u64,
    /// Seed the in-memory store with a demo site
    pub seed_demo_site: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: String::new(),
            service_key: String::new(),
            http_timeout_secs: 10,
            seed_demo_site: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("DERF__").split("__"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_extract() {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default())).extract().unwrap();
        assert_eq!(cfg.forecast.lookback_days, 30);
        assert_eq!(cfg.forecast.upsert_batch_size, 50);
        assert_eq!(cfg.forecast.conflict_policy, ConflictPolicy::IgnoreDuplicates);
        assert_eq!(cfg.prediction.model_version, "1.2.0");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.tariff.import_rate, 0.18);
    }

    #[test]
    fn test_toml_overrides() {
        let toml = r#"
            [forecast]
            conflict_policy = "overwrite"
            max_temp_factor = 1.8

            [store]
            backend = "postgrest"
            url = "https://db.example.invalid"
        "#;
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        assert_eq!(cfg.forecast.conflict_policy, ConflictPolicy::Overwrite);
        assert_eq!(cfg.forecast.max_temp_factor, Some(1.8));
        assert_eq!(cfg.forecast.max_days, 14);
        assert_eq!(cfg.store.backend, StoreBackend::Postgrest);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig::default();
        assert_eq!(server.socket_addr().unwrap().port(), 8080);
    }
}
