use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::watch::WatchHandle;

/// The sync-backend collaborator (§6): a hierarchical, watchable KV store.
///
/// Implemented against a real sync-backend client in production and by
/// `gohan-testkit::FakeSyncBackend` in tests.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn update(&self, key: &str, value: Value) -> Result<(), BackendError>;

    /// Deleting an absent key is not an error (§4.3's at-least-once tolerance).
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    async fn fetch(&self, key: &str) -> Result<Option<Value>, BackendError>;

    /// Attempt to acquire the named lock. `blocking` selects whether the
    /// caller wants to wait for contention to clear (watch-loop locks) or
    /// fail fast (the pump's lease attempt, §4.3 step 2).
    async fn lock(&self, key: &str, blocking: bool) -> Result<(), BackendError>;

    async fn unlock(&self, key: &str) -> Result<(), BackendError>;

    async fn watch(&self, prefix: &str) -> Result<WatchHandle, BackendError>;
}
