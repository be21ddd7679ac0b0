use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::StoreBackend;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: StoreBackend,
    timestamp: DateTime<Utc>,
}

/// GET /healthz
pub async fn healthz(State(st): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: st.cfg.store.backend,
        timestamp: Utc::now(),
    })
}
