use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gohan_reconcile::{ExtContext, ExtensionEnvironment, ReconcileError};

/// In-memory stand-in for a real extension environment, used by scenario
/// tests that need to assert a hook fired (and with what context) without a
/// scripting runtime.
///
/// Call log is shared across clones (`clone_env` per §6's `Clone()`
/// contract), since the whole point of the fake is to observe what the
/// production code invoked.
#[derive(Default)]
pub struct FakeExtension {
    calls: Arc<Mutex<Vec<(String, ExtContext)>>>,
    fail_on: Arc<Mutex<Option<String>>>,
}

impl FakeExtension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle_event` return an error the next time `hook_name` fires.
    pub fn fail_on(&self, hook_name: impl Into<String>) {
        *self.fail_on.lock().unwrap() = Some(hook_name.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, hook_name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == hook_name)
            .count()
    }

    pub fn last_context(&self) -> Option<ExtContext> {
        self.calls.lock().unwrap().last().map(|(_, ctx)| ctx.clone())
    }
}

#[async_trait]
impl ExtensionEnvironment for FakeExtension {
    async fn handle_event(&self, name: &str, context: ExtContext) -> Result<(), ReconcileError> {
        self.calls.lock().unwrap().push((name.to_string(), context));
        if self.fail_on.lock().unwrap().as_deref() == Some(name) {
            return Err(ReconcileError::Extension(format!("{name} configured to fail")));
        }
        Ok(())
    }

    fn clone_env(&self) -> Box<dyn ExtensionEnvironment> {
        Box::new(FakeExtension {
            calls: self.calls.clone(),
            fail_on: self.fail_on.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_can_be_configured_to_fail() {
        let ext = FakeExtension::new();
        ext.handle_event("pre_state_update_in_transaction", ExtContext::default())
            .await
            .unwrap();
        assert_eq!(ext.call_count(), 1);

        ext.fail_on("post_state_update_in_transaction");
        let err = ext
            .handle_event("post_state_update_in_transaction", ExtContext::default())
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn clone_env_shares_the_call_log() {
        let ext = FakeExtension::new();
        let cloned = ext.clone_env();
        cloned
            .handle_event("notification", ExtContext::default())
            .await
            .unwrap();
        assert_eq!(ext.call_count(), 1, "clone shares the original's call log");
    }
}
