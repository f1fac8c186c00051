use thiserror::Error;

/// Typed error surface for the sync-backend collaborator and the path
/// renderer (§6, §4.4).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("lock unavailable: {0}")]
    LockUnavailable(String),

    #[error("sync-backend transport error: {0}")]
    Transport(String),

    #[error("key not found: {0}")]
    NotFound(String),
}

/// Path-rendering failure (§4.4): a placeholder named `field` had no matching
/// top-level field in the resource body, or the field was not a scalar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sync key template field missing or malformed: {field}")]
pub struct RenderError {
    pub field: String,
}
