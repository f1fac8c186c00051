//! Scenario: create → propagate (§8.a). A single captured `create` event
//! drains to the rendered `/config/<suffix>` key with its version attached,
//! and the outbox empties.

use std::sync::Arc;

use chrono::Utc;
use gohan_backend::SyncBackend;
use gohan_db::OutboxStore;
use gohan_pump::{run_once, PumpTunables};
use gohan_schemas::{EventRow, EventType, Schema, SchemaRegistry};
use gohan_testkit::{FakeDb, FakeSyncBackend};
use serde_json::json;

#[tokio::test]
async fn create_event_drains_to_rendered_config_key() {
    let db = Arc::new(FakeDb::new());
    db.push_event(EventRow {
        id: 1,
        event_type: EventType::Create,
        path: "/v1.0/networks/a".to_string(),
        version: 1,
        body: json!({"id": "a", "name": "n1"}).to_string(),
        timestamp: Utc::now(),
    });

    let backend = Arc::new(FakeSyncBackend::new());
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

    let value = backend.snapshot().get("/config/nets/a").cloned().expect("key written");
    assert_eq!(value["version"], 1);
    assert_eq!(
        value["body"].as_str().unwrap(),
        json!({"id": "a", "name": "n1"}).to_string()
    );

    assert_eq!(db.event_count(), 0, "outbox must be empty after drain");
}
