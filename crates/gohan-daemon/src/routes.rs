//! Minimal liveness surface (§4.10): a `/healthz`-equivalent the operator can
//! poll. Ambient operability, not the REST surface the Non-goals exclude.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

/// Build the daemon's router. `main.rs` attaches tracing/CORS layers after
/// this call; tests use the bare router directly.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new().route("/healthz", get(healthz)).with_state(state)
}

async fn healthz(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let ok = !st.shutdown.is_signaled();
    let status = if ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(HealthResponse {
            ok,
            service: st.build.service,
            version: st.build.version,
            uptime_secs: st.uptime_secs(),
        }),
    )
}
