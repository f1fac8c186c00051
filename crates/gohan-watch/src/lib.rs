//! Watch supervisor (C7, §4.7) and extension dispatcher (C8, §4.8): the
//! inbound half of the cluster synchronization core.

mod error;
mod supervisor;
mod worker;

pub use error::WatchError;
pub use supervisor::{run_monitoring_watch, run_state_watch, run_user_watch};
pub use worker::WorkQueue;
