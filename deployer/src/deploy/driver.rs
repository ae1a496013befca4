//! Provisioning driver
//!
//! Runs the external tool through `init`, `destroy`, `plan` and `apply` in the
//! workspace. A failing destroy is expected on a fresh account (nothing to
//! destroy yet) and only produces a warning; every other failing step ends
//! the run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::deploy::command::{CommandOutput, CommandRunner};
use crate::deploy::fsm::{ProvisionEvent, ProvisionFsm, ProvisionState, StepTimeouts};
use crate::errors::DeployError;

/// One step of the provisioning sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    Init,
    Destroy,
    Plan,
    Apply,
}

impl ProvisionStep {
    /// Shell command for this step
    pub fn command(&self, tool: &str) -> String {
        match self {
            ProvisionStep::Init => format!("{} init", tool),
            ProvisionStep::Destroy => format!("{} destroy -auto-approve", tool),
            ProvisionStep::Plan => format!("{} plan", tool),
            ProvisionStep::Apply => format!("{} apply -auto-approve", tool),
        }
    }

    pub fn timeout(&self, timeouts: &StepTimeouts) -> Duration {
        match self {
            ProvisionStep::Init => timeouts.init,
            ProvisionStep::Destroy => timeouts.destroy,
            ProvisionStep::Plan => timeouts.plan,
            ProvisionStep::Apply => timeouts.apply,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionSummary {
    pub init_success: bool,
    pub destroy_success: bool,
    pub plan_success: bool,
    pub plan_output: String,
    pub apply_output: String,
}

/// Drives the provisioning tool
pub struct ProvisionDriver {
    runner: Arc<dyn CommandRunner>,
    tool: String,
    timeouts: StepTimeouts,
    fsm: RwLock<ProvisionFsm>,
}

impl ProvisionDriver {
    /// Create a new driver for `tool` (e.g. `terraform`)
    pub fn new(runner: Arc<dyn CommandRunner>, tool: impl Into<String>, timeouts: StepTimeouts) -> Self {
        Self {
            runner,
            tool: tool.into(),
            timeouts,
            fsm: RwLock::new(ProvisionFsm::new()),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// State reached by the latest run
    pub async fn state(&self) -> ProvisionState {
        self.fsm.read().await.state().clone()
    }

    /// Run the full sequence in `workspace`
    pub async fn run(&self, workspace: &Path) -> Result<ProvisionSummary, DeployError> {
        info!("Provisioning with {} in {}", self.tool, workspace.display());
        *self.fsm.write().await = ProvisionFsm::new();

        let init = self.step(ProvisionStep::Init, workspace).await;
        if !init.success() {
            self.transition(ProvisionEvent::InitFailed(init.stderr.clone()))
                .await?;
            return Err(DeployError::ProvisionInitError {
                stdout: init.stdout,
                stderr: init.stderr,
                code: init.code,
            });
        }
        self.transition(ProvisionEvent::InitSucceeded).await?;

        let destroy = self.step(ProvisionStep::Destroy, workspace).await;
        if !destroy.success() {
            warn!(
                "{} destroy exited with {}, continuing: {}",
                self.tool,
                destroy.code,
                destroy.stderr.trim()
            );
        }
        self.transition(ProvisionEvent::DestroyFinished).await?;

        let plan = self.step(ProvisionStep::Plan, workspace).await;
        if !plan.success() {
            self.transition(ProvisionEvent::PlanFailed(plan.stderr.clone()))
                .await?;
            return Err(DeployError::ProvisionPlanError {
                stdout: plan.stdout,
                stderr: plan.stderr,
                code: plan.code,
            });
        }
        self.transition(ProvisionEvent::PlanSucceeded).await?;

        let apply = self.step(ProvisionStep::Apply, workspace).await;
        if !apply.success() {
            self.transition(ProvisionEvent::ApplyFailed(apply.stderr.clone()))
                .await?;
            return Err(DeployError::ProvisionApplyError {
                stdout: apply.stdout,
                stderr: apply.stderr,
                code: apply.code,
            });
        }
        self.transition(ProvisionEvent::ApplySucceeded).await?;

        info!("Provisioning finished in {}", workspace.display());
        Ok(ProvisionSummary {
            init_success: true,
            destroy_success: destroy.success(),
            plan_success: true,
            plan_output: plan.stdout,
            apply_output: apply.stdout,
        })
    }

    async fn step(&self, step: ProvisionStep, workspace: &Path) -> CommandOutput {
        let command = step.command(&self.tool);
        let timeout = step.timeout(&self.timeouts);
        info!("Running `{}` (timeout {}s)", command, timeout.as_secs());

        let output = self.runner.run(&command, workspace, timeout).await;
        debug!("`{}` exited with {}", command, output.code);
        output
    }

    async fn transition(&self, event: ProvisionEvent) -> Result<(), DeployError> {
        let mut fsm = self.fsm.write().await;
        fsm.process(event).map_err(DeployError::Internal)
    }
}
