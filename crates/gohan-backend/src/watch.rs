use serde_json::Value;

/// The action carried by an inbound watch event, per §6's
/// `Event{Action: "set"|"delete", ...}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    Set,
    Delete,
}

impl WatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchAction::Set => "set",
            WatchAction::Delete => "delete",
        }
    }
}

/// One delivered watch event.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub action: WatchAction,
    pub key: String,
    pub data: Value,
}

/// A live watch: the receiving half of the event channel plus a stop handle.
/// Dropping `stop` (or calling [`WatchHandle::stop`]) tells the backend to
/// terminate the underlying watch and close `events`.
pub struct WatchHandle {
    pub events: tokio::sync::mpsc::Receiver<WatchEvent>,
    stop: tokio::sync::oneshot::Sender<()>,
}

impl WatchHandle {
    pub fn new(
        events: tokio::sync::mpsc::Receiver<WatchEvent>,
        stop: tokio::sync::oneshot::Sender<()>,
    ) -> Self {
        Self { events, stop }
    }

    pub fn stop(self) {
        let _ = self.stop.send(());
    }
}
