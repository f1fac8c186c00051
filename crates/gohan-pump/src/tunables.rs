use std::time::Duration;

/// The pump's three tunables (§6): poll interval, batch limit, and the key the
/// cluster lock is taken on. Compiled defaults, overridable per-deployment via
/// `gohan-config` (§4.9).
#[derive(Debug, Clone)]
pub struct PumpTunables {
    pub poll_interval: Duration,
    pub batch_limit: i64,
    pub lock_key: String,
}

impl Default for PumpTunables {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            batch_limit: 10_000,
            lock_key: "gohan/cluster/sync".to_string(),
        }
    }
}
