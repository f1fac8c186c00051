//! State reconciler (C5, §4.5) and monitoring reconciler (C6, §4.6): the
//! async orchestration around the pure decisions in [`crate::gate`].

use std::sync::Arc;

use gohan_db::{IsolationLevel, StateStore};
use gohan_schemas::SchemaRegistry;
use serde_json::Value;
use tracing::debug;

use crate::error::ReconcileError;
use crate::extension::{ExtContext, ExtensionRegistry};
use crate::gate::{decide_monitoring_update, decide_state_update, MonitoringDecision, MonitoringPayload, StateDecision, StatePayload};

/// Handle one watch event delivered under the state prefix (§4.5). Returns
/// `Ok(())` for every outcome that isn't a hard error — schema mismatches,
/// non-versioned schemas, stale reports, and already-converged resources are
/// all silently ignored per spec, not surfaced as errors.
pub async fn reconcile_state_event(
    db: &Arc<dyn StateStore>,
    schemas: &SchemaRegistry,
    extensions: &ExtensionRegistry,
    stripped_path: &str,
    payload: &Value,
) -> Result<(), ReconcileError> {
    let Some(schema) = schemas.find_by_path(stripped_path) else {
        debug!(path = %stripped_path, "state event matches no registered schema");
        return Ok(());
    };
    if !schema.state_versioning {
        debug!(schema = %schema.id, "state event on non-versioned schema, ignoring");
        return Ok(());
    }
    let resource_id = resource_id_from_path(stripped_path);

    let txn = db
        .begin_state_update(&schema.id, resource_id, IsolationLevel::ReadCommitted)
        .await?;
    let current = txn.current().cloned().unwrap_or_default();

    let parsed = parse_state_payload(payload)?;

    match decide_state_update(&current, &parsed) {
        StateDecision::AlreadyConverged => Ok(()),
        StateDecision::OutOfOrder {
            old_state_version,
            reported_version,
        } => {
            debug!(
                schema = %schema.id,
                resource_id,
                old_state_version,
                reported_version,
                "out-of-order state report ignored"
            );
            Ok(())
        }
        StateDecision::Apply { new_state } => {
            let context = ExtContext {
                resource: None,
                schema_id: Some(schema.id.clone()),
                payload: payload.clone(),
                prior_config_version: Some(current.config_version),
                ..Default::default()
            };

            if let Some(env) = extensions.for_schema(&schema.id) {
                env.handle_event("pre_state_update_in_transaction", context.clone())
                    .await
                    .map_err(|e| ReconcileError::Extension(e.to_string()))?;
                txn.commit(new_state).await?;
                env.handle_event("post_state_update_in_transaction", context)
                    .await
                    .map_err(|e| ReconcileError::Extension(e.to_string()))?;
            } else {
                txn.commit(new_state).await?;
            }
            Ok(())
        }
    }
}

/// Handle one watch event delivered under the monitoring prefix (§4.6).
pub async fn reconcile_monitoring_event(
    db: &Arc<dyn StateStore>,
    schemas: &SchemaRegistry,
    extensions: &ExtensionRegistry,
    stripped_path: &str,
    payload: &Value,
) -> Result<(), ReconcileError> {
    let Some(schema) = schemas.find_by_path(stripped_path) else {
        debug!(path = %stripped_path, "monitoring event matches no registered schema");
        return Ok(());
    };
    if !schema.state_versioning {
        debug!(schema = %schema.id, "monitoring event on non-versioned schema, ignoring");
        return Ok(());
    }
    let resource_id = resource_id_from_path(stripped_path);

    let txn = db
        .begin_state_update(&schema.id, resource_id, IsolationLevel::ReadCommitted)
        .await?;
    let current = txn.current().cloned().unwrap_or_default();

    let parsed = parse_monitoring_payload(payload)?;

    match decide_monitoring_update(&current, &parsed) {
        MonitoringDecision::NotConverged { .. } | MonitoringDecision::VersionMismatch { .. } => {
            Ok(())
        }
        MonitoringDecision::Apply { new_state } => {
            let context = ExtContext {
                resource: None,
                schema_id: Some(schema.id.clone()),
                payload: payload.clone(),
                prior_config_version: Some(current.config_version),
                ..Default::default()
            };

            if let Some(env) = extensions.for_schema(&schema.id) {
                env.handle_event("pre_monitoring_update_in_transaction", context.clone())
                    .await
                    .map_err(|e| ReconcileError::Extension(e.to_string()))?;
                txn.commit(new_state).await?;
                env.handle_event("post_monitoring_update_in_transaction", context)
                    .await
                    .map_err(|e| ReconcileError::Extension(e.to_string()))?;
            } else {
                txn.commit(new_state).await?;
            }
            Ok(())
        }
    }
}

fn resource_id_from_path(path: &str) -> &str {
    path.rsplit('/').find(|segment| !segment.is_empty()).unwrap_or("")
}

fn parse_state_payload(payload: &Value) -> Result<StatePayload, ReconcileError> {
    let version = payload
        .get("version")
        .and_then(Value::as_i64)
        .ok_or_else(|| ReconcileError::MalformedPayload("missing or non-integer version".into()))?;
    Ok(StatePayload {
        version,
        state: payload.get("state").and_then(Value::as_str).map(String::from),
        error: payload.get("error").and_then(Value::as_str).map(String::from),
    })
}

fn parse_monitoring_payload(payload: &Value) -> Result<MonitoringPayload, ReconcileError> {
    let version = payload
        .get("version")
        .and_then(Value::as_i64)
        .ok_or_else(|| ReconcileError::MalformedPayload("missing or non-integer version".into()))?;
    let monitoring = payload
        .get("monitoring")
        .and_then(Value::as_str)
        .ok_or_else(|| ReconcileError::MalformedPayload("missing monitoring field".into()))?
        .to_string();
    Ok(MonitoringPayload { version, monitoring })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_is_the_final_path_segment() {
        assert_eq!(resource_id_from_path("/v1.0/networks/abc"), "abc");
        assert_eq!(resource_id_from_path("/nets/abc/"), "abc");
    }

    #[test]
    fn parse_state_payload_requires_version() {
        let payload = serde_json::json!({"state": "active"});
        assert!(parse_state_payload(&payload).is_err());
    }

    #[test]
    fn parse_monitoring_payload_requires_monitoring_field() {
        let payload = serde_json::json!({"version": 5});
        assert!(parse_monitoring_payload(&payload).is_err());
    }
}
