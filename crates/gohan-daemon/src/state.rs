//! Shared runtime state for gohan-daemon's liveness surface.

use std::sync::Arc;
use std::time::Instant;

use gohan_schemas::ShutdownFlag;
use serde::{Deserialize, Serialize};

/// Static build metadata included in the liveness response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc-backed) handle shared across the liveness route. Does not
/// carry the pump/watch collaborators themselves — those are owned by the
/// spawned tasks in `main.rs`, not by the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub shutdown: ShutdownFlag,
    start: Arc<Instant>,
}

impl AppState {
    pub fn new(shutdown: ShutdownFlag) -> Self {
        Self {
            build: BuildInfo {
                service: "gohan-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            shutdown,
            start: Arc::new(Instant::now()),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}
