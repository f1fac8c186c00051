//! Database collaborator (§6): Postgres-backed transactional outbox writer
//! (C1), outbox batch reads for the pump (C3), and resource-state reads/writes
//! for the reconcilers (C5/C6).

mod error;
mod notifier;
mod pg;
mod traits;

pub use error::DbError;
pub use gohan_schemas::IsolationLevel;
pub use notifier::CommitNotifier;
pub use pg::{PgDb, ENV_DB_URL};
pub use traits::{OutboxStore, StateStore, StateUpdateTxn};
