//! In-process scenario tests for gohan-daemon's liveness surface.
//!
//! These tests spin up the Axum router **without** binding a TCP socket,
//! driving it via `tower::ServiceExt::oneshot` — no network I/O required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use gohan_daemon::{routes, state};
use gohan_schemas::ShutdownFlag;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn make_router(shutdown: ShutdownFlag) -> axum::Router {
    let st = Arc::new(state::AppState::new(shutdown));
    routes::build_router(st)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

#[tokio::test]
async fn healthz_returns_200_ok_true_before_shutdown() {
    let shutdown = ShutdownFlag::new();
    let router = make_router(shutdown);
    let req = Request::builder()
        .method("GET")
        .uri("/healthz")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "gohan-daemon");
}

#[tokio::test]
async fn healthz_returns_503_once_shutdown_is_signaled() {
    let shutdown = ShutdownFlag::new();
    shutdown.signal();
    let router = make_router(shutdown);
    let req = Request::builder()
        .method("GET")
        .uri("/healthz")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let json = parse_json(body);
    assert_eq!(json["ok"], false);
}
