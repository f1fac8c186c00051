//! Collaborator wiring seams deliberately left outside this spec's scope
//! (§1 Non-goals: schema DSL, scripting runtime, sync-backend protocol).
//!
//! `main.rs` calls these to get a runnable daemon out of the box; a real
//! deployment replaces them with registries populated from the schema DSL
//! and a `SyncBackend` implementation that actually speaks the cluster's
//! wire protocol.

use std::sync::Arc;

use gohan_backend::SyncBackend;
use gohan_reconcile::ExtensionRegistry;
use gohan_schemas::SchemaRegistry;
use gohan_testkit::FakeSyncBackend;

/// Placeholder seam where the schema DSL would register resource kinds at
/// boot. An empty registry is spec-legal: the path renderer falls back to
/// raw URL paths (§4.4) and the reconcilers skip unmatched schemas (§4.5,
/// §4.6) rather than erroring.
pub fn build_schema_registry() -> SchemaRegistry {
    SchemaRegistry::default()
}

/// Placeholder seam where configured extension environments (the scripting
/// runtime) would be bound from `Config::extension_bindings` at boot.
pub fn build_extension_registry() -> ExtensionRegistry {
    ExtensionRegistry::new()
}

/// Placeholder sync-backend client. Implementing the real cluster wire
/// protocol is an explicit Non-goal (§1); this in-memory stand-in keeps the
/// daemon runnable standalone. A production deployment swaps this for a real
/// `SyncBackend` impl behind the same trait object — no other wiring changes.
pub fn build_sync_backend() -> Arc<dyn SyncBackend> {
    Arc::new(FakeSyncBackend::new())
}
