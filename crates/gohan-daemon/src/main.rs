//! gohan-daemon entry point.
//!
//! This file is intentionally thin (§4.10): load configuration, connect and
//! migrate the database, wire the collaborators, spawn the long-lived tasks
//! (pump, watch loops, extension worker queue), and serve the liveness
//! surface until a shutdown signal arrives. All route handlers live in
//! `routes.rs`; shared HTTP state lives in `state.rs`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use gohan_daemon::{routes, state, wiring};
use gohan_db::{OutboxStore, PgDb, StateStore};
use gohan_pump::{CommitNotifier, PumpTunables};
use gohan_schemas::ShutdownFlag;
use gohan_watch::WorkQueue;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

const CONFIG_PATHS: &[&str] = &["config/base.yaml", "config/local.yaml"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if missing —
    // production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = gohan_config::Config::load(CONFIG_PATHS).context("failed to load configuration")?;

    let notifier = CommitNotifier::new();
    let db = PgDb::connect_with_notifier(&config.database_url, notifier.clone())
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run database migrations")?;

    let schemas = Arc::new(wiring::build_schema_registry());
    let extensions = Arc::new(wiring::build_extension_registry());
    let backend = wiring::build_sync_backend();

    let outbox_store: Arc<dyn OutboxStore> = Arc::new(db.clone());
    let state_store: Arc<dyn StateStore> = Arc::new(db.clone());

    let shutdown = ShutdownFlag::new();
    let tunables = PumpTunables {
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        batch_limit: config.batch_limit,
        lock_key: "gohan/cluster/sync".to_string(),
    };
    let retry_delay = Duration::from_secs(config.lock_retry_delay_secs);

    tokio::spawn(gohan_pump::run(
        outbox_store,
        backend.clone(),
        schemas.clone(),
        notifier,
        tunables,
        shutdown.clone(),
    ));

    tokio::spawn(gohan_watch::run_state_watch(
        backend.clone(),
        state_store.clone(),
        schemas.clone(),
        extensions.clone(),
        "gohan/cluster/lockstate".to_string(),
        retry_delay,
        shutdown.clone(),
    ));

    tokio::spawn(gohan_watch::run_monitoring_watch(
        backend.clone(),
        state_store,
        schemas,
        extensions.clone(),
        "gohan/cluster/lockmonitoring".to_string(),
        retry_delay,
        shutdown.clone(),
    ));

    let (queue, _worker_handle) = WorkQueue::spawn(extensions, 256);
    let queue = Arc::new(queue);
    for binding in &config.extension_bindings {
        tokio::spawn(gohan_watch::run_user_watch(
            backend.clone(),
            binding.prefix.clone(),
            queue.clone(),
            "gohan/cluster/lockwatch".to_string(),
            retry_delay,
            shutdown.clone(),
        ));
    }

    let app_state = Arc::new(state::AppState::new(shutdown.clone()));
    let app = routes::build_router(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 9898)));
    info!("gohan-daemon listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let serve = axum::serve(listener, app);

    tokio::select! {
        result = serve => { result.context("server crashed")?; }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            shutdown.signal();
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("GOHAN_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins, matching the operator-tooling
/// convention used elsewhere in this lineage.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(tower_http::cors::Any)
}
