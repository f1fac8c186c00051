//! Version-gate decisions for the state and monitoring reconcilers (§4.5,
//! §4.6). Pure functions: no IO, no clock — callers fetch state and apply
//! the prescribed action.

use gohan_schemas::ResourceState;

/// An inbound state report (§6's `/state/<path>` payload).
#[derive(Debug, Clone)]
pub struct StatePayload {
    pub version: i64,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// An inbound monitoring report (§6's `/monitoring/<path>` payload).
#[derive(Debug, Clone)]
pub struct MonitoringPayload {
    pub version: i64,
    pub monitoring: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateDecision {
    /// `state_version == config_version` already; nothing to do.
    AlreadyConverged,
    /// Reported version is older than the last accepted one; discard.
    OutOfOrder { old_state_version: i64, reported_version: i64 },
    /// Apply this updated record.
    Apply { new_state: ResourceState },
}

/// Decide what to do with an inbound state report against the resource's
/// current state record (§4.5).
pub fn decide_state_update(current: &ResourceState, payload: &StatePayload) -> StateDecision {
    if current.state_version == current.config_version {
        return StateDecision::AlreadyConverged;
    }
    if payload.version < current.state_version {
        return StateDecision::OutOfOrder {
            old_state_version: current.state_version,
            reported_version: payload.version,
        };
    }

    let mut new_state = current.clone();
    new_state.state_version = payload.version;
    if let Some(error) = &payload.error {
        new_state.error = Some(error.clone());
    }
    if let Some(state) = &payload.state {
        new_state.state = Some(state.clone());
    }
    StateDecision::Apply { new_state }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitoringDecision {
    /// State has not yet converged to the current config; skip.
    NotConverged { config_version: i64, state_version: i64 },
    /// Reported version doesn't match the converged config version; skip.
    VersionMismatch { config_version: i64, payload_version: i64 },
    /// Apply this updated record.
    Apply { new_state: ResourceState },
}

/// Decide what to do with an inbound monitoring report (§4.6). Requires
/// `config_version == state_version` and `payload.version == config_version`.
pub fn decide_monitoring_update(
    current: &ResourceState,
    payload: &MonitoringPayload,
) -> MonitoringDecision {
    if current.config_version != current.state_version {
        return MonitoringDecision::NotConverged {
            config_version: current.config_version,
            state_version: current.state_version,
        };
    }
    if payload.version != current.config_version {
        return MonitoringDecision::VersionMismatch {
            config_version: current.config_version,
            payload_version: payload.version,
        };
    }

    let mut new_state = current.clone();
    new_state.monitoring = Some(payload.monitoring.clone());
    MonitoringDecision::Apply { new_state }
}
