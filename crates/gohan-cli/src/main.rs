//! `gohan`: an operator-facing CLI for the synchronization core (§10).
//!
//! Thin wrapper over the library crates — no business logic lives here, only
//! argument parsing and printing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gohan_db::{OutboxStore, PgDb};
use gohan_pump::PumpTunables;
use gohan_schemas::SchemaRegistry;
use gohan_testkit::FakeSyncBackend;

const CONFIG_PATHS: &[&str] = &["config/base.yaml", "config/local.yaml"];

#[derive(Parser)]
#[command(name = "gohan")]
#[command(about = "Operator CLI for the gohan synchronization core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,

    /// Layered config paths, in merge order. Defaults to config/base.yaml
    /// then config/local.yaml.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the number of rows currently waiting in the outbox.
    OutboxDepth,

    /// Run exactly one pump iteration (lock, drain, unlock) and report what
    /// was drained, without waiting on the poll timer.
    PumpOnce,

    /// Load and print the fully resolved configuration as JSON.
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_paths: Vec<&str> = if cli.config_paths.is_empty() {
        CONFIG_PATHS.to_vec()
    } else {
        cli.config_paths.iter().map(String::as_str).collect()
    };

    match cli.cmd {
        Commands::OutboxDepth => {
            let config = gohan_config::Config::load(&config_paths).context("failed to load configuration")?;
            let db = PgDb::connect(&config.database_url)
                .await
                .context("failed to connect to database")?;
            // No dedicated count query (§6 exposes read_batch, not count);
            // a large batch read is an acceptable approximation for an
            // operator-facing depth check.
            let rows = db.read_batch(i64::MAX).await.context("failed to read outbox")?;
            println!("outbox_depth={}", rows.len());
        }

        Commands::PumpOnce => {
            let config = gohan_config::Config::load(&config_paths).context("failed to load configuration")?;
            let db = PgDb::connect(&config.database_url)
                .await
                .context("failed to connect to database")?;

            let outbox_store: Arc<dyn OutboxStore> = Arc::new(db);
            // The real sync-backend client is out of scope (§1 Non-goals);
            // this placeholder mirrors the one wired into gohan-daemon.
            let backend: Arc<dyn gohan_backend::SyncBackend> = Arc::new(FakeSyncBackend::new());
            let schemas = Arc::new(SchemaRegistry::default());
            let tunables = PumpTunables {
                poll_interval: Duration::from_secs(config.poll_interval_secs),
                batch_limit: config.batch_limit,
                lock_key: "gohan/cluster/sync".to_string(),
            };

            let drained = gohan_pump::run_once(&outbox_store, &backend, &schemas, &tunables)
                .await
                .context("pump iteration failed")?;
            println!("drained={drained}");
        }

        Commands::PrintConfig => {
            let merged = gohan_config::load_layered_yaml(&config_paths).context("failed to load configuration")?;
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }
    }

    Ok(())
}
