//! Sync pump (C3, §4.3). The commit notifier (C2, §4.2) it wakes on lives in
//! `gohan-db` alongside the outbox writer (C1) that is the one obligated to
//! call it; re-exported here so callers don't need to depend on `gohan-db`
//! just to name the type.

mod error;
mod pump;
mod tunables;

pub use error::PumpError;
pub use gohan_db::CommitNotifier;
pub use pump::{run, run_once};
pub use tunables::PumpTunables;
