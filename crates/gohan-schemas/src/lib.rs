//! Domain types shared across the cluster synchronization core.
//!
//! Mirrors the row/DTO shapes the database and sync-backend collaborators
//! pass around: schemas, resources, outbox events, and per-resource state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Metadata for a resource kind, as registered with the schema DSL.
///
/// Only the attributes the synchronization core needs are modeled here; the
/// full schema DSL (attribute types, validation rules, relations) lives
/// outside this crate's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: String,
    /// URL-path prefix this schema's resources are served under, e.g. `/v1.0/networks`.
    pub path_prefix: String,
    pub state_versioning: bool,
    /// `{{field}}` placeholder template used by the path renderer (C4).
    pub sync_key_template: Option<String>,
    /// Suppresses outbox logging entirely when set.
    pub nosync: bool,
}

impl Schema {
    pub fn new(id: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path_prefix: path_prefix.into(),
            state_versioning: false,
            sync_key_template: None,
            nosync: false,
        }
    }

    pub fn versioned(mut self) -> Self {
        self.state_versioning = true;
        self
    }

    pub fn with_sync_key_template(mut self, template: impl Into<String>) -> Self {
        self.sync_key_template = Some(template.into());
        self
    }

    pub fn nosync(mut self) -> Self {
        self.nosync = true;
        self
    }

    /// `true` if `path` falls under this schema's URL-path prefix.
    pub fn matches_path(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix)
    }
}

/// A persisted resource: its schema id, canonical path, and config body.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub schema_id: String,
    pub id: String,
    /// Canonical URL path, e.g. `/v1.0/networks/abc`.
    pub path: String,
    pub body: Value,
}

/// The kind of mutation that produced an [`EventRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Create,
    Update,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Update => "update",
            EventType::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(EventType::Create),
            "update" => Some(EventType::Update),
            "delete" => Some(EventType::Delete),
            _ => None,
        }
    }
}

/// An outbox row: one captured mutation awaiting propagation to the sync backend.
#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: i64,
    pub event_type: EventType,
    pub path: String,
    pub version: i64,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-resource state record: config/state version pair plus the last
/// reported state/error/monitoring strings.
#[derive(Debug, Clone, Default)]
pub struct ResourceState {
    pub config_version: i64,
    pub state_version: i64,
    pub state: Option<String>,
    pub error: Option<String>,
    pub monitoring: Option<String>,
}

impl ResourceState {
    /// `true` once the last reported agent state matches the current config.
    pub fn is_converged(&self) -> bool {
        self.state_version == self.config_version
    }
}

/// Isolation level a caller may request for a transaction, per the database
/// collaborator's `SetIsolationLevel` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// In-memory set of registered schemas, used by the pump and reconcilers to
/// derive a resource's schema from its URL path.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
}

impl SchemaRegistry {
    pub fn new(schemas: Vec<Schema>) -> Self {
        Self { schemas }
    }

    pub fn register(&mut self, schema: Schema) {
        self.schemas.push(schema);
    }

    /// The schema whose `path_prefix` matches `path`, preferring the longest
    /// (most specific) prefix when more than one matches.
    pub fn find_by_path(&self, path: &str) -> Option<&Schema> {
        self.schemas
            .iter()
            .filter(|s| s.matches_path(path))
            .max_by_key(|s| s.path_prefix.len())
    }

    pub fn find_by_id(&self, schema_id: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.id == schema_id)
    }
}

/// Process-wide cooperative shutdown flag shared by the daemon's long-lived
/// tasks (the pump, the watch loops, the worker queue). Cheap to clone;
/// every holder observes the same flip.
#[derive(Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
