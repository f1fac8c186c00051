//! State reconciler (C5, §4.5), monitoring reconciler (C6, §4.6), and the
//! extension collaborator (§6, C8) they dispatch into.

mod engine;
mod error;
mod extension;
mod gate;

pub use engine::{reconcile_monitoring_event, reconcile_state_event};
pub use error::ReconcileError;
pub use extension::{ExtContext, ExtensionEnvironment, ExtensionRegistry};
pub use gate::{
    decide_monitoring_update, decide_state_update, MonitoringDecision, MonitoringPayload,
    StateDecision, StatePayload,
};
