use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gohan_db::{DbError, IsolationLevel, OutboxStore, StateStore, StateUpdateTxn};
use gohan_schemas::{EventRow, ResourceState};

/// In-memory stand-in for [`gohan_db::PgDb`], used by scenario tests that
/// don't need a live Postgres instance.
#[derive(Default)]
pub struct FakeDb {
    events: Mutex<BTreeMap<i64, EventRow>>,
    state: Arc<Mutex<BTreeMap<(String, String), ResourceState>>>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event row, as C1 would inside a committed transaction.
    pub fn push_event(&self, event: EventRow) {
        self.events.lock().unwrap().insert(event.id, event);
    }

    pub fn set_state(&self, schema_id: impl Into<String>, resource_id: impl Into<String>, state: ResourceState) {
        self.state
            .lock()
            .unwrap()
            .insert((schema_id.into(), resource_id.into()), state);
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn get_state(&self, schema_id: &str, resource_id: &str) -> Option<ResourceState> {
        self.state
            .lock()
            .unwrap()
            .get(&(schema_id.to_string(), resource_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl OutboxStore for FakeDb {
    async fn read_batch(&self, limit: i64) -> Result<Vec<EventRow>, DbError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn delete_event(&self, id: i64) -> Result<(), DbError> {
        self.events.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[async_trait]
impl StateStore for FakeDb {
    /// No real transaction or isolation level here, just a lock held across
    /// the handle's lifetime — this stand-in only needs to preserve the
    /// decide-then-apply contract the trait describes, not demonstrate
    /// Postgres locking semantics.
    async fn begin_state_update(
        &self,
        schema_id: &str,
        resource_id: &str,
        _isolation: IsolationLevel,
    ) -> Result<Box<dyn StateUpdateTxn>, DbError> {
        let current = self.get_state(schema_id, resource_id);
        Ok(Box::new(FakeStateUpdateTxn {
            state: self.state.clone(),
            key: (schema_id.to_string(), resource_id.to_string()),
            current,
        }))
    }
}

struct FakeStateUpdateTxn {
    state: Arc<Mutex<BTreeMap<(String, String), ResourceState>>>,
    key: (String, String),
    current: Option<ResourceState>,
}

#[async_trait]
impl StateUpdateTxn for FakeStateUpdateTxn {
    fn current(&self) -> Option<&ResourceState> {
        self.current.as_ref()
    }

    async fn commit(self: Box<Self>, new_state: ResourceState) -> Result<(), DbError> {
        self.state.lock().unwrap().insert(self.key, new_state);
        Ok(())
    }
}
