pub mod error;
pub mod forecasts;
pub mod health;
pub mod predictions;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{config::Config, state::AppState};

pub fn router(state: AppState, cfg: &Config) -> Router {
    let v1 = Router::new()
        .route("/forecasts", post(forecasts::create_forecast))
        .route("/predictions", post(predictions::predict))
        .route("/predictions/model", get(predictions::model_status))
        .route("/predictions/feedback", post(predictions::feedback));

    let mut router = Router::new()
        .nest("/api/v1", v1)
        .route("/healthz", get(health::healthz))
        .with_state(state);

    if cfg.server.enable_cors {
        router = router.layer(cors());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.server.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}

/// Any origin; browser clients send their API key and client info headers.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}
