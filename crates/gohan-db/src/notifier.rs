use std::sync::Arc;

use tokio::sync::Notify;

/// Process-wide, single-slot commit signal (C2, §4.2).
///
/// Lives alongside the outbox writer (C1) rather than the pump (C3) because
/// it's the writer side that owns the obligation to call `notify()`; the
/// pump only ever reads it. `notify()` is non-blocking and coalescing: any
/// number of calls between two `notified()` waits collapse into a single
/// wake-up, matching the outbox's "wake the pump early, don't queue work"
/// contract. Cheap to clone.
#[derive(Clone, Default)]
pub struct CommitNotifier(Arc<Notify>);

impl CommitNotifier {
    pub fn new() -> Self {
        Self(Arc::new(Notify::new()))
    }

    /// Called by a transaction that just committed at least one event row.
    pub fn notify(&self) {
        self.0.notify_one();
    }

    /// Resolves once `notify()` has been called since the last resolution.
    pub async fn notified(&self) {
        self.0.notified().await;
    }
}
