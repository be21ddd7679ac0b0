use anyhow::Result;
use der_forecast::{api, config::Config, state::AppState, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to read .env: {e}");
        }
    }

    let cfg = Config::load()?;
    telemetry::init_tracing(cfg.server.log_json);

    let state = AppState::new(cfg.clone()).await?;
    let app = api::router(state, &cfg);

    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0; the service is reachable from the network");
    }
    info!(%addr, store = ?cfg.store.backend, "starting der-forecast");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
