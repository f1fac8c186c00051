use gohan_backend::BackendError;
use gohan_db::DbError;
use thiserror::Error;

/// Typed error surface for the sync pump (§4.3).
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("sync-backend error: {0}")]
    Backend(#[from] BackendError),
}
