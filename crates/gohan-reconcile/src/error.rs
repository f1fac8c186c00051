use gohan_db::DbError;
use thiserror::Error;

/// Typed error surface for the state/monitoring reconcilers (§4.5, §4.6, §7).
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// Inbound event payload was missing a required field or had the wrong
    /// type. Logged and dropped by the caller; never retried.
    #[error("malformed reconcile payload: {0}")]
    MalformedPayload(String),

    /// An extension hook returned an error. The triggering update is aborted.
    #[error("extension hook failed: {0}")]
    Extension(String),
}
