//! Extension dispatcher (C8, §4.8): a shared worker queue that decouples
//! user-configured watch delivery from extension execution.
//!
//! The watch supervisor enqueues every event observed under a user-configured
//! prefix; this module drains the queue, finds the extension environment
//! whose configured event name prefixes the event's key, clones it, and fires
//! the `notification` hook. Dispatch errors are logged and swallowed — per
//! §4.8 these are fire-and-forget notifications, not transactional work.

use std::sync::Arc;

use gohan_backend::WatchEvent;
use gohan_reconcile::{ExtContext, ExtensionRegistry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WatchError;

/// Handle to the running worker queue plus its background drain task.
pub struct WorkQueue {
    tx: mpsc::Sender<WatchEvent>,
}

impl WorkQueue {
    /// Spawn the queue's drain task. `capacity` bounds how many undelivered
    /// watch events may be buffered before `enqueue` backpressures.
    pub fn spawn(extensions: Arc<ExtensionRegistry>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(capacity);

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatch(&extensions, event).await;
            }
        });

        (Self { tx }, handle)
    }

    /// Enqueue one watch event for extension dispatch. Never blocks the
    /// caller on extension execution itself (§4.7).
    pub async fn enqueue(&self, event: WatchEvent) -> Result<(), WatchError> {
        self.tx.send(event).await.map_err(|_| WatchError::QueueClosed)
    }
}

async fn dispatch(extensions: &ExtensionRegistry, event: WatchEvent) {
    let Some(env) = extensions.for_event_key(&event.key) else {
        debug!(key = %event.key, "watch event matches no configured extension binding");
        return;
    };

    let context = ExtContext {
        action: Some(event.action.as_str().to_string()),
        payload: event.data.clone(),
        key: Some(event.key.clone()),
        ..Default::default()
    };

    if let Err(e) = env.handle_event("notification", context).await {
        warn!(key = %event.key, error = %e, "extension notification failed, dropping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gohan_backend::WatchAction;
    use gohan_reconcile::{ExtensionEnvironment, ReconcileError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingEnv {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ExtensionEnvironment for CountingEnv {
        async fn handle_event(&self, name: &str, _context: ExtContext) -> Result<(), ReconcileError> {
            assert_eq!(name, "notification");
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn clone_env(&self) -> Box<dyn ExtensionEnvironment> {
            Box::new(CountingEnv {
                calls: self.calls.clone(),
            })
        }
    }

    #[tokio::test]
    async fn matching_event_dispatches_notification() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.bind_event_name("provision", Box::new(CountingEnv { calls: calls.clone() }));

        let (queue, _handle) = WorkQueue::spawn(Arc::new(registry), 16);
        queue
            .enqueue(WatchEvent {
                action: WatchAction::Set,
                key: "/provision/nets/a".to_string(),
                data: serde_json::json!({}),
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmatched_event_is_dropped_without_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.bind_event_name("provision", Box::new(CountingEnv { calls: calls.clone() }));

        let (queue, _handle) = WorkQueue::spawn(Arc::new(registry), 16);
        queue
            .enqueue(WatchEvent {
                action: WatchAction::Set,
                key: "/other/nets/a".to_string(),
                data: serde_json::json!({}),
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
