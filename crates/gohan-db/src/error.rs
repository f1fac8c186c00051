use thiserror::Error;

/// Typed error surface for the database collaborator (§7: transient I/O,
/// malformed payload, programmer error).
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("resource not found: schema={schema_id} id={resource_id}")]
    ResourceNotFound { schema_id: String, resource_id: String },

    #[error("resource state not found: schema={schema_id} id={resource_id}")]
    StateNotFound { schema_id: String, resource_id: String },

    #[error("missing env var {0}")]
    MissingEnvVar(String),
}
