use gohan_backend::BackendError;
use thiserror::Error;

/// Typed error surface for the watch supervisor and extension worker queue
/// (C7/C8, §4.7, §4.8, §7).
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("sync-backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("worker queue is closed")]
    QueueClosed,
}
