//! Extension collaborator (§6, C8): a single `handle_event` entry point
//! looked up by schema id (state/monitoring hooks) or by configured event
//! name (watch hooks). Environments are cloned per invocation so concurrent
//! dispatches don't share mutable state.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ReconcileError;

/// Context passed to every hook. Fields are populated according to which hook
/// fired; callers leave irrelevant fields at their default.
#[derive(Debug, Clone, Default)]
pub struct ExtContext {
    pub resource: Option<Value>,
    pub schema_id: Option<String>,
    pub payload: Value,
    pub prior_config_version: Option<i64>,
    pub auth_catalog: Option<Value>,
    pub auth_token: Option<String>,
    pub action: Option<String>,
    pub key: Option<String>,
}

#[async_trait]
pub trait ExtensionEnvironment: Send + Sync {
    /// `name` is the hook name: `pre_state_update_in_transaction`,
    /// `post_state_update_in_transaction`, `pre_monitoring_update_in_transaction`,
    /// `post_monitoring_update_in_transaction`, or `notification`.
    async fn handle_event(&self, name: &str, context: ExtContext) -> Result<(), ReconcileError>;

    /// Produce an isolated clone for one invocation's mutable state.
    fn clone_env(&self) -> Box<dyn ExtensionEnvironment>;
}

/// Looks up extension environments by schema id (for C5/C6) or by configured
/// event name (for C8). Holds prototypes; callers clone before invoking.
#[derive(Default)]
pub struct ExtensionRegistry {
    by_schema: HashMap<String, Box<dyn ExtensionEnvironment>>,
    by_event_name: HashMap<String, Box<dyn ExtensionEnvironment>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_schema(&mut self, schema_id: impl Into<String>, env: Box<dyn ExtensionEnvironment>) {
        self.by_schema.insert(schema_id.into(), env);
    }

    pub fn bind_event_name(&mut self, event_name: impl Into<String>, env: Box<dyn ExtensionEnvironment>) {
        self.by_event_name.insert(event_name.into(), env);
    }

    /// A fresh clone of the environment bound to `schema_id`, if any.
    pub fn for_schema(&self, schema_id: &str) -> Option<Box<dyn ExtensionEnvironment>> {
        self.by_schema.get(schema_id).map(|env| env.clone_env())
    }

    /// The environment whose configured event name is a prefix of the
    /// event's key (`/<event-name>`), per §4.8.
    pub fn for_event_key(&self, key: &str) -> Option<Box<dyn ExtensionEnvironment>> {
        self.by_event_name
            .iter()
            .find(|(name, _)| key.starts_with(&format!("/{name}")))
            .map(|(_, env)| env.clone_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEnv {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ExtensionEnvironment for CountingEnv {
        async fn handle_event(&self, _name: &str, _context: ExtContext) -> Result<(), ReconcileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn clone_env(&self) -> Box<dyn ExtensionEnvironment> {
            Box::new(CountingEnv {
                calls: self.calls.clone(),
            })
        }
    }

    #[tokio::test]
    async fn schema_bound_environment_is_found_and_cloned() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.bind_schema("networks", Box::new(CountingEnv { calls: calls.clone() }));

        let env = registry.for_schema("networks").expect("bound");
        env.handle_event("pre_state_update_in_transaction", ExtContext::default())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.for_schema("subnets").is_none());
    }

    #[tokio::test]
    async fn event_name_lookup_matches_key_prefix() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.bind_event_name("provision", Box::new(CountingEnv { calls }));

        assert!(registry.for_event_key("/provision/nets/a").is_some());
        assert!(registry.for_event_key("/other/nets/a").is_none());
    }
}
