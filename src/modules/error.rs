use thiserror::Error;

use crate::modules::resource::Carry;

/// Non-fatal, cycle-local dispatch failures. Each one is logged as a warning
/// and retried against fresh state next cycle.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("agent {agent} has no terminal, storage or reserve container to unload into")]
    NoFallbackStore { agent: String },

    #[error("agent {agent} found no single store holding {needed}")]
    NoFeasibleSource { agent: String, needed: Carry },

    #[error("agent {agent} has no reachable standby spot; holding position")]
    NoChargingSpot { agent: String },
}

impl DispatchError {
    pub fn agent(&self) -> &str {
        match self {
            DispatchError::NoFallbackStore { agent }
            | DispatchError::NoFeasibleSource { agent, .. }
            | DispatchError::NoChargingSpot { agent } => agent,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            DispatchError::NoFallbackStore { .. } => "no_fallback_store",
            DispatchError::NoFeasibleSource { .. } => "no_feasible_source",
            DispatchError::NoChargingSpot { .. } => "no_charging_spot",
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
