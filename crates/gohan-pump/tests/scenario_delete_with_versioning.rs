//! Scenario: delete with versioning (§8.b). A `delete` event removes all
//! three twins (config, state, monitoring) at the rendered suffix, tolerating
//! keys that were already absent.

use std::sync::Arc;

use chrono::Utc;
use gohan_backend::SyncBackend;
use gohan_db::OutboxStore;
use gohan_pump::{run_once, PumpTunables};
use gohan_schemas::{EventRow, EventType, Schema, SchemaRegistry};
use gohan_testkit::{FakeDb, FakeSyncBackend};
use serde_json::json;

#[tokio::test]
async fn delete_event_removes_config_state_and_monitoring_twins() {
    let db = Arc::new(FakeDb::new());
    db.push_event(EventRow {
        id: 7,
        event_type: EventType::Delete,
        path: "/v1.0/networks/a".to_string(),
        version: 4,
        body: json!({"id": "a", "name": "n1"}).to_string(),
        timestamp: Utc::now(),
    });

    let backend = Arc::new(FakeSyncBackend::new());
    // Pre-seed the config twin; state/monitoring are intentionally absent to
    // exercise the §4.3 tolerance for deleting an already-missing key.
    backend
        .update("/config/nets/a", json!({"body": "{}", "version": 3}))
        .await
        .unwrap();

    let mut registry = SchemaRegistry::default();
    registry.register(
        Schema::new("networks", "/v1.0/networks").with_sync_key_template("/nets/{{id}}"),
    );
    let schemas = Arc::new(registry);
    let tunables = PumpTunables::default();

    let db_dyn: Arc<dyn OutboxStore> = db.clone();
    let backend_dyn: Arc<dyn SyncBackend> = backend.clone();

    let drained = run_once(&db_dyn, &backend_dyn, &schemas, &tunables).await.unwrap();
    assert!(drained);

    assert!(!backend.contains_key("/config/nets/a"));
    assert!(!backend.contains_key("/state/nets/a"));
    assert!(!backend.contains_key("/monitoring/nets/a"));
    assert_eq!(db.event_count(), 0);
}
