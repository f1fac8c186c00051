use async_trait::async_trait;
use gohan_schemas::{EventRow, IsolationLevel, ResourceState};

use crate::error::DbError;

/// The outbox half of the database collaborator (§6): read ordered batches
/// and delete rows once their sync-backend side effect has been acknowledged.
///
/// Implemented by [`crate::PgDb`] against Postgres and by
/// `gohan-testkit::FakeDb` for tests that don't need a live database.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Read up to `limit` events ordered ascending by `id`.
    async fn read_batch(&self, limit: i64) -> Result<Vec<EventRow>, DbError>;

    /// Delete a single event row by id. Deleting an absent id is not an error.
    async fn delete_event(&self, id: i64) -> Result<(), DbError>;
}

/// The resource-state half of the database collaborator (§6): the
/// reconcilers (C5/C6) operate on the per-resource
/// `config_version`/`state_version`/`state`/`error`/`monitoring` record under
/// this single entry point, which opens the schema-declared-isolation
/// transaction §4.5 requires and row-locks the fetched record for the
/// lifetime of the decide-then-apply sequence, closing the lost-update race
/// between two concurrent reports for the same resource.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Begin a `state_update` transaction at `isolation` and fetch+lock the
    /// named resource's current state record. `None` if no such record
    /// exists. The returned handle must be committed exactly once; dropping
    /// it without committing rolls the transaction back.
    async fn begin_state_update(
        &self,
        schema_id: &str,
        resource_id: &str,
        isolation: IsolationLevel,
    ) -> Result<Box<dyn StateUpdateTxn>, DbError>;
}

/// An open `state_update` transaction (§4.5) holding the row lock taken by
/// [`StateStore::begin_state_update`].
#[async_trait]
pub trait StateUpdateTxn: Send {
    /// The state record as it was when the transaction began, if any.
    fn current(&self) -> Option<&ResourceState>;

    /// Write `new_state` and commit. Consumes the handle so it can only be
    /// called once.
    async fn commit(self: Box<Self>, new_state: ResourceState) -> Result<(), DbError>;
}
