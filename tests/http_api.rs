//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use der_forecast::api;
use der_forecast::config::Config;
use der_forecast::repo::{memory::DEMO_SITE_ID, InMemoryRepo, Repositories};
use der_forecast::state::AppState;

fn app() -> Router {
    let mut cfg = Config::default();
    cfg.forecast.random_seed = Some(42);
    cfg.prediction.random_seed = Some(42);

    let repo = Arc::new(InMemoryRepo::new());
    repo.seed_demo_site(DEMO_SITE_ID, Utc::now());
    let repos = Repositories {
        telemetry: repo.clone(),
        forecasts: repo,
    };
    let state = AppState::with_repositories(cfg.clone(), repos);
    api::router(state, &cfg)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn preflight_is_answered_with_permissive_cors() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/forecasts")
        .header(header::ORIGIN, "https://dashboard.example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "apikey,x-client-info,content-type")
        .body(Body::empty())
        .unwrap();

    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let allowed = resp.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap();
    assert!(allowed.contains("apikey"));
    assert!(allowed.contains("x-client-info"));
}

#[tokio::test]
async fn forecast_for_demo_site() {
    let resp = app()
        .oneshot(post_json("/api/v1/forecasts", json!({"siteId": DEMO_SITE_ID, "days": 2})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Generated 48 hourly forecasts for 2 days");
    let forecasts = body["forecasts"].as_array().unwrap();
    assert_eq!(forecasts.len(), 48);
    assert!(forecasts[0]["generationKw"].is_number());
    assert!(forecasts[0]["confidencePct"].as_u64().unwrap() <= 95);
    assert_eq!(body["costs"].as_array().unwrap().len(), 2);
    assert_eq!(body["persisted"]["written"], 48);
}

#[tokio::test]
async fn forecast_days_default_to_three() {
    let resp = app()
        .oneshot(post_json("/api/v1/forecasts", json!({"siteId": DEMO_SITE_ID})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["forecasts"].as_array().unwrap().len(), 72);
    assert_eq!(body["message"], "Generated 72 hourly forecasts for 3 days");
}

#[tokio::test]
async fn forecast_for_unknown_site_is_404() {
    let resp = app()
        .oneshot(post_json("/api/v1/forecasts", json!({"siteId": "nowhere", "days": 1})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = json_body(resp).await;
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn forecast_rejects_zero_days() {
    let resp = app()
        .oneshot(post_json("/api/v1/forecasts", json!({"siteId": DEMO_SITE_ID, "days": 0})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["kind"], "validation");
}

#[tokio::test]
async fn malformed_body_is_400() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/forecasts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].is_string());
}

#[tokio::test]
async fn prediction_with_too_few_points_is_400() {
    let resp = app()
        .oneshot(post_json("/api/v1/predictions", json!({"energyData": [10, 11, 12]})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["kind"], "insufficient_data");
    assert!(body["error"].as_str().unwrap().contains("at least 7"));
}

#[tokio::test]
async fn prediction_returns_days_and_recommendations() {
    let data: Vec<Value> = (0..14).map(|i| json!({"value": 20.0 + f64::from(i)})).collect();
    let resp = app()
        .oneshot(post_json(
            "/api/v1/predictions",
            json!({"energyData": data, "predictionDays": 3, "latestDate": "2024-06-09"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["model_version"], "1.2.0");
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0]["date"], "2024-06-10");
    assert_eq!(predictions[0]["dayOffset"], 1);

    let ids: Vec<&str> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.first(), Some(&"peak_usage_shift"));
    // rising series triggers the audit
    assert!(ids.contains(&"efficiency_audit"));
}

#[tokio::test]
async fn model_status_and_feedback() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/predictions/model")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["version"], "1.2.0");
    assert!(body["lastTrained"].is_null());

    let resp = app()
        .oneshot(post_json(
            "/api/v1/predictions/feedback",
            json!({"recommendationId": "battery_optimization", "notes": "done"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["accepted"], true);
}

#[tokio::test]
async fn healthz_reports_ok() {
    let resp = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}
