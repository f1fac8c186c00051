//! Sync-backend collaborator (§6) and path renderer (§4.4, C4).

mod collaborator;
mod error;
mod render;
mod watch;

pub use collaborator::SyncBackend;
pub use error::{BackendError, RenderError};
pub use render::{
    config_key, monitoring_key, render_suffix, render_template, state_key, CONFIG_PREFIX,
    MONITORING_PREFIX, STATE_PREFIX,
};
pub use watch::{WatchAction, WatchEvent, WatchHandle};
