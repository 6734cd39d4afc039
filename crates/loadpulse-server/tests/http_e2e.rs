//! Drives both routers in-process, the way a load generator and a scraper would.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use loadpulse_server::app_state::AppState;
use loadpulse_server::config::LoadpulseConfig;
use loadpulse_server::router;
use loadpulse_server::workload::CpuTaskKind;

fn routers() -> (Router, Router) {
    routers_with(&LoadpulseConfig::default())
}

fn routers_with(cfg: &LoadpulseConfig) -> (Router, Router) {
    let state = AppState::new(cfg);
    (
        router::build_api_router(state.clone()),
        router::build_metrics_router(state),
    )
}

async fn post(app: &Router, path: &str, body: &str) -> (StatusCode, String) {
    let req = Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn scrape(app: &Router) -> String {
    let req = Request::get("/metrics").body(Body::empty()).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Value of the first sample line starting with `series `.
fn sample(body: &str, series: &str) -> Option<f64> {
    body.lines()
        .find_map(|l| l.strip_prefix(series)?.strip_prefix(' '))
        .and_then(|v| v.parse().ok())
}

#[tokio::test]
async fn cpu_trigger_counts_ops() {
    let (api, metrics) = routers();

    let (status, text) = post(&api, "/cpu", r#"{"ops":100}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Triggered CPU workload: workers=1, ops=100");

    let body = scrape(&metrics).await;
    assert_eq!(sample(&body, r#"workload_ops_total{type="cpu_node"}"#), Some(100.0));
    assert_eq!(sample(&body, r#"workload_latency_seconds_count{type="cpu_node"}"#), Some(100.0));
    // every CPU op spins at least 2.5ms
    assert_eq!(
        sample(&body, r#"workload_latency_seconds_bucket{type="cpu_node",le="0.001"}"#),
        Some(0.0)
    );
    assert_eq!(sample(&body, r#"workload_heap_kb_count{type="cpu_node"}"#), Some(1.0));
    assert!(sample(&body, "process_uptime_seconds").is_some());

    // counts accumulate across triggers
    post(&api, "/cpu", r#"{"ops":5}"#).await;
    let body = scrape(&metrics).await;
    assert_eq!(sample(&body, r#"workload_ops_total{type="cpu_node"}"#), Some(105.0));
    assert_eq!(sample(&body, r#"workload_heap_kb_count{type="cpu_node"}"#), Some(2.0));
}

#[tokio::test]
async fn io_trigger_defaults_to_one_op() {
    let (api, metrics) = routers();

    let (status, text) = post(&api, "/io", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Triggered IO workload: workers=1, ops=1");

    let body = scrape(&metrics).await;
    assert_eq!(sample(&body, r#"workload_ops_total{type="io_node"}"#), Some(1.0));
    assert!(!body.contains(r#"type="cpu_node""#));
}

#[tokio::test]
async fn mixed_trigger_splits_latencies() {
    let (api, metrics) = routers();

    let (status, text) = post(&api, "/cpui", r#"{"ops":1000,"ratio":0.2}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Triggered CPU+IO workload: workers=1, ops=1000, ratio=0.2");

    let body = scrape(&metrics).await;
    assert_eq!(sample(&body, r#"workload_ops_total{type="mixed_node"}"#), Some(1000.0));
    assert_eq!(
        sample(&body, r#"workload_latency_seconds_count{type="mixed_node"}"#),
        Some(1000.0)
    );
    assert_eq!(
        sample(&body, r#"workload_latency_seconds_bucket{type="mixed_node",le="+Inf"}"#),
        Some(1000.0)
    );
    // nothing finishes under the 2.5ms floor both primitives share
    assert_eq!(
        sample(&body, r#"workload_latency_seconds_bucket{type="mixed_node",le="0.001"}"#),
        Some(0.0)
    );
}

#[tokio::test]
async fn workers_divide_ops_on_a_single_loop() {
    let (api, metrics) = routers();

    let (status, text) = post(&api, "/io", r#"{"workers":4,"ops":10}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Triggered IO workload: workers=4, ops=10");

    let body = scrape(&metrics).await;
    assert_eq!(sample(&body, r#"workload_ops_total{type="io_node"}"#), Some(2.0));
    assert_eq!(sample(&body, r#"workload_heap_kb_count{type="io_node"}"#), Some(1.0));
}

#[tokio::test]
async fn malformed_body_is_rejected_without_recording() {
    let (api, metrics) = routers();

    let (status, text) = post(&api, "/cpu", "{ops: 10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(err["code"], "BAD_REQUEST");

    let (status, _) = post(&api, "/cpui", r#"{"ratio":2}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = scrape(&metrics).await;
    assert!(!body.contains("workload_ops_total{"));
    assert!(!body.contains("workload_latency_seconds_count{"));
    assert_eq!(
        sample(&body, r#"workload_rejected_requests_total{type="cpu_node"}"#),
        Some(1.0)
    );
}

#[tokio::test]
async fn health_endpoints() {
    let (api, metrics) = routers();
    for app in [&api, &metrics] {
        let res = app
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = metrics
        .clone()
        .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_reports_draining() {
    let state = AppState::new(&LoadpulseConfig::default());
    let metrics = router::build_metrics_router(state.clone());
    state.set_draining();

    let res = metrics
        .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = scrape(&router::build_metrics_router(state)).await;
    assert_eq!(sample(&body, "loadpulse_draining"), Some(1.0));
}

#[tokio::test]
async fn fixed_cpu_task_keeps_cpu_label() {
    let mut cfg = LoadpulseConfig::default();
    cfg.workload.cpu_task = CpuTaskKind::Fixed;
    let (api, metrics) = routers_with(&cfg);

    let (status, text) = post(&api, "/cpu", r#"{"ops":3}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Triggered CPU workload: workers=1, ops=3");

    let body = scrape(&metrics).await;
    assert_eq!(sample(&body, r#"workload_ops_total{type="cpu_node"}"#), Some(3.0));
    assert_eq!(sample(&body, r#"workload_latency_seconds_count{type="cpu_node"}"#), Some(3.0));
}

#[tokio::test]
async fn fan_out_is_capped_by_ops() {
    let mut cfg = LoadpulseConfig::default();
    cfg.orchestrator.fan_out = true;
    let (api, metrics) = routers_with(&cfg);

    let (status, text) = post(&api, "/io", r#"{"workers":100000,"ops":2}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Triggered IO workload: workers=100000, ops=2");

    let body = scrape(&metrics).await;
    assert_eq!(sample(&body, r#"workload_ops_total{type="io_node"}"#), Some(2.0));
    assert_eq!(sample(&body, r#"workload_heap_kb_count{type="io_node"}"#), Some(2.0));
}
