//! Finite State Machine for a provisioning run

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-step timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTimeouts {
    pub init: Duration,
    pub destroy: Duration,
    pub plan: Duration,
    pub apply: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(120),
            destroy: Duration::from_secs(600),
            plan: Duration::from_secs(300),
            apply: Duration::from_secs(1200),
        }
    }
}

/// Provisioning state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionState {
    /// Initializing the working directory
    Init,

    /// Tearing down whatever a previous run left behind
    Destroying,

    /// Computing the execution plan
    Planning,

    /// Applying the plan
    Applying,

    /// Apply finished
    Succeeded,

    /// A fatal step failed
    Failed,
}

/// Provisioning event
#[derive(Debug, Clone)]
pub enum ProvisionEvent {
    InitSucceeded,

    InitFailed(String),

    /// Destroy finished, whatever its exit code
    DestroyFinished,

    PlanSucceeded,

    PlanFailed(String),

    ApplySucceeded,

    ApplyFailed(String),
}

/// Provisioning FSM
#[derive(Debug, Clone)]
pub struct ProvisionFsm {
    state: ProvisionState,
    error: Option<String>,
}

impl ProvisionFsm {
    /// Create a new FSM in the init state
    pub fn new() -> Self {
        Self {
            state: ProvisionState::Init,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &ProvisionState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ProvisionState::Succeeded | ProvisionState::Failed)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: ProvisionEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (ProvisionState::Init, ProvisionEvent::InitSucceeded) => ProvisionState::Destroying,
            (ProvisionState::Init, ProvisionEvent::InitFailed(err)) => {
                self.error = Some(err.clone());
                ProvisionState::Failed
            }

            // Destroy failures are absorbed
            (ProvisionState::Destroying, ProvisionEvent::DestroyFinished) => {
                ProvisionState::Planning
            }

            (ProvisionState::Planning, ProvisionEvent::PlanSucceeded) => ProvisionState::Applying,
            (ProvisionState::Planning, ProvisionEvent::PlanFailed(err)) => {
                self.error = Some(err.clone());
                ProvisionState::Failed
            }

            (ProvisionState::Applying, ProvisionEvent::ApplySucceeded) => {
                ProvisionState::Succeeded
            }
            (ProvisionState::Applying, ProvisionEvent::ApplyFailed(err)) => {
                self.error = Some(err.clone());
                ProvisionState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for ProvisionFsm {
    fn default() -> Self {
        Self::new()
    }
}
