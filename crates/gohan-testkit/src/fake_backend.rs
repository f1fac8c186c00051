use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use gohan_backend::{BackendError, SyncBackend, WatchEvent, WatchHandle};
use serde_json::Value;
use tokio::sync::mpsc;

/// In-memory stand-in for a real sync-backend client, used by scenario tests.
///
/// `lock`/`unlock` model contention with a plain key set rather than real
/// leases; `watch` fans events pushed via [`FakeSyncBackend::emit`] out to
/// every registered watcher whose prefix matches.
#[derive(Default)]
pub struct FakeSyncBackend {
    data: Mutex<HashMap<String, Value>>,
    locked: Mutex<HashSet<String>>,
    watchers: Mutex<Vec<(String, mpsc::Sender<WatchEvent>)>>,
}

impl FakeSyncBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.data.lock().unwrap().clone()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }

    /// Pre-lock `key` so the next `lock()` call from the code under test
    /// observes contention, simulating a peer holding the lease.
    pub fn pre_lock(&self, key: &str) {
        self.locked.lock().unwrap().insert(key.to_string());
    }

    /// Deliver `event` to every watcher whose registered prefix matches.
    pub async fn emit(&self, event: WatchEvent) {
        let watchers: Vec<_> = self.watchers.lock().unwrap().clone();
        for (prefix, tx) in watchers {
            if event.key.starts_with(&prefix) {
                let _ = tx.send(event.clone()).await;
            }
        }
    }
}

#[async_trait]
impl SyncBackend for FakeSyncBackend {
    async fn update(&self, key: &str, value: Value) -> Result<(), BackendError> {
        self.data.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<Value>, BackendError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn lock(&self, key: &str, _blocking: bool) -> Result<(), BackendError> {
        let mut locked = self.locked.lock().unwrap();
        if locked.contains(key) {
            return Err(BackendError::LockUnavailable(key.to_string()));
        }
        locked.insert(key.to_string());
        Ok(())
    }

    async fn unlock(&self, key: &str) -> Result<(), BackendError> {
        self.locked.lock().unwrap().remove(key);
        Ok(())
    }

    async fn watch(&self, prefix: &str) -> Result<WatchHandle, BackendError> {
        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, _stop_rx) = tokio::sync::oneshot::channel();
        self.watchers.lock().unwrap().push((prefix.to_string(), tx));
        Ok(WatchHandle::new(rx, stop_tx))
    }
}
