//! Sync pump (C3, §4.3): the single long-lived task that drains the outbox
//! into the sync backend under the cluster lock.

use std::sync::Arc;

use gohan_backend::{config_key, monitoring_key, state_key, BackendError, SyncBackend};
use gohan_db::{CommitNotifier, OutboxStore};
use gohan_schemas::{EventRow, EventType, SchemaRegistry, ShutdownFlag};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::PumpError;
use crate::tunables::PumpTunables;

/// Runs the pump loop until `shutdown` is signaled. Intended to be spawned as
/// its own task by the daemon entrypoint.
pub async fn run(
    db: Arc<dyn OutboxStore>,
    backend: Arc<dyn SyncBackend>,
    schemas: Arc<SchemaRegistry>,
    notifier: CommitNotifier,
    tunables: PumpTunables,
    shutdown: ShutdownFlag,
) {
    let mut ticker = tokio::time::interval(tunables.poll_interval);
    ticker.tick().await; // the first tick fires immediately; consume it up front

    let mut drained_last_iteration = false;

    loop {
        if shutdown.is_signaled() {
            info!("pump shutting down");
            return;
        }

        if drained_last_iteration {
            // Debounce: a burst just drained, so skip the next scheduled poll
            // and wake only from a fresh commit signal.
            ticker.tick().await;
        }

        tokio::select! {
            _ = notifier.notified() => {}
            _ = ticker.tick() => {}
        }

        if shutdown.is_signaled() {
            info!("pump shutting down");
            return;
        }

        match run_iteration(&db, &backend, &schemas, &tunables).await {
            Ok(drained) => drained_last_iteration = drained,
            Err(e) => {
                warn!(error = %e, "pump iteration failed, retrying next tick");
                drained_last_iteration = false;
            }
        }
    }
}

/// Run exactly one pump iteration (lock attempt, drain, unlock) and return
/// whether any events were drained. Exposed for the ops CLI's "force one
/// pump iteration" command and for scenario tests that don't want to wait
/// on the poll timer.
pub async fn run_once(
    db: &Arc<dyn OutboxStore>,
    backend: &Arc<dyn SyncBackend>,
    schemas: &Arc<SchemaRegistry>,
    tunables: &PumpTunables,
) -> Result<bool, PumpError> {
    run_iteration(db, backend, schemas, tunables).await
}

async fn run_iteration(
    db: &Arc<dyn OutboxStore>,
    backend: &Arc<dyn SyncBackend>,
    schemas: &Arc<SchemaRegistry>,
    tunables: &PumpTunables,
) -> Result<bool, PumpError> {
    match backend.lock(&tunables.lock_key, false).await {
        Ok(()) => {}
        Err(BackendError::LockUnavailable(_)) => {
            debug!("sync lock held by another instance");
            return Ok(false);
        }
        Err(e) => {
            warn!(error = %e, "sync lock attempt failed");
            return Ok(false);
        }
    }

    let outcome = drain_batch(db, backend, schemas, tunables.batch_limit).await;

    if let Err(e) = backend.unlock(&tunables.lock_key).await {
        warn!(error = %e, "failed to release sync lock");
    }

    outcome
}

async fn drain_batch(
    db: &Arc<dyn OutboxStore>,
    backend: &Arc<dyn SyncBackend>,
    schemas: &Arc<SchemaRegistry>,
    limit: i64,
) -> Result<bool, PumpError> {
    let batch = db.read_batch(limit).await?;
    if batch.is_empty() {
        return Ok(false);
    }

    info!(count = batch.len(), "draining outbox batch");
    for event in &batch {
        apply_event(db, backend, schemas, event).await?;
    }
    Ok(true)
}

async fn apply_event(
    db: &Arc<dyn OutboxStore>,
    backend: &Arc<dyn SyncBackend>,
    schemas: &Arc<SchemaRegistry>,
    event: &EventRow,
) -> Result<(), PumpError> {
    let schema = schemas.find_by_path(&event.path);
    if schema.is_none() {
        debug!(path = %event.path, "event path matches no registered schema, using raw path");
    }
    let body: Value = serde_json::from_str(&event.body).unwrap_or(Value::Null);

    match event.event_type {
        EventType::Create | EventType::Update => {
            let key = match schema {
                Some(s) => config_key(s, &event.path, &body),
                None => format!("/config{}", event.path),
            };
            let value = serde_json::json!({ "body": event.body, "version": event.version });
            backend.update(&key, value).await?;
        }
        EventType::Delete => {
            let (state_k, monitoring_k, config_k) = match schema {
                Some(s) => (
                    state_key(s, &event.path, &body),
                    monitoring_key(s, &event.path, &body),
                    config_key(s, &event.path, &body),
                ),
                None => (
                    format!("/state{}", event.path),
                    format!("/monitoring{}", event.path),
                    format!("/config{}", event.path),
                ),
            };

            if let Err(e) = backend.delete(&state_k).await {
                warn!(key = %state_k, error = %e, "state twin delete failed, ignoring");
            }
            if let Err(e) = backend.delete(&monitoring_k).await {
                warn!(key = %monitoring_k, error = %e, "monitoring twin delete failed, ignoring");
            }
            backend.delete(&config_k).await?;
        }
    }

    db.delete_event(event.id).await?;
    Ok(())
}
