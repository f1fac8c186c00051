//! Scenarios c, d, e (§8): a stale state report is discarded, a catch-up
//! report is applied and dispatches extension hooks, and a monitoring report
//! is gated on state convergence before being applied.

use std::sync::Arc;

use gohan_db::StateStore;
use gohan_reconcile::{reconcile_monitoring_event, reconcile_state_event, ExtensionRegistry};
use gohan_schemas::{ResourceState, Schema, SchemaRegistry};
use gohan_testkit::{FakeDb, FakeExtension};
use serde_json::json;

fn networks_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::default();
    registry.register(Schema::new("networks", "/v1.0/networks").versioned());
    registry
}

#[tokio::test]
async fn stale_state_report_is_discarded() {
    let db = Arc::new(FakeDb::new());
    db.set_state(
        "networks",
        "a",
        ResourceState {
            config_version: 5,
            state_version: 5,
            ..Default::default()
        },
    );
    let schemas = networks_registry();
    let extensions = ExtensionRegistry::new();

    let db_dyn: Arc<dyn StateStore> = db.clone();
    reconcile_state_event(
        &db_dyn,
        &schemas,
        &extensions,
        "/v1.0/networks/a",
        &json!({"version": 3}),
    )
    .await
    .unwrap();

    let state = db.get_state("networks", "a").unwrap();
    assert_eq!(state.state_version, 5, "already-converged resource must not mutate");
}

#[tokio::test]
async fn catch_up_state_report_applies_and_dispatches_extension() {
    let db = Arc::new(FakeDb::new());
    db.set_state(
        "networks",
        "a",
        ResourceState {
            config_version: 5,
            state_version: 2,
            ..Default::default()
        },
    );
    let schemas = networks_registry();
    let mut extensions = ExtensionRegistry::new();
    let ext = Arc::new(FakeExtension::new());
    extensions.bind_schema("networks", ext.clone_env());

    let db_dyn: Arc<dyn StateStore> = db.clone();
    reconcile_state_event(
        &db_dyn,
        &schemas,
        &extensions,
        "/v1.0/networks/a",
        &json!({"version": 5, "state": "active"}),
    )
    .await
    .unwrap();

    let state = db.get_state("networks", "a").unwrap();
    assert_eq!(state.state_version, 5);
    assert_eq!(state.state.as_deref(), Some("active"));
    assert_eq!(ext.calls_for("pre_state_update_in_transaction"), 1);
    assert_eq!(ext.calls_for("post_state_update_in_transaction"), 1);
}

#[tokio::test]
async fn monitoring_skipped_until_state_converges_then_applied() {
    let db = Arc::new(FakeDb::new());
    db.set_state(
        "networks",
        "a",
        ResourceState {
            config_version: 5,
            state_version: 3,
            ..Default::default()
        },
    );
    let schemas = networks_registry();
    let extensions = ExtensionRegistry::new();
    let db_dyn: Arc<dyn StateStore> = db.clone();

    reconcile_monitoring_event(
        &db_dyn,
        &schemas,
        &extensions,
        "/v1.0/networks/a",
        &json!({"version": 5, "monitoring": "ok"}),
    )
    .await
    .unwrap();
    assert!(
        db.get_state("networks", "a").unwrap().monitoring.is_none(),
        "monitoring must not apply before state converges"
    );

    db.set_state(
        "networks",
        "a",
        ResourceState {
            config_version: 5,
            state_version: 5,
            ..Default::default()
        },
    );
    reconcile_monitoring_event(
        &db_dyn,
        &schemas,
        &extensions,
        "/v1.0/networks/a",
        &json!({"version": 5, "monitoring": "ok"}),
    )
    .await
    .unwrap();
    assert_eq!(db.get_state("networks", "a").unwrap().monitoring.as_deref(), Some("ok"));
}
