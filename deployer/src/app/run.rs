//! One deployment job: build the service, run it, always clean up

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::deploy::command::ShellRunner;
use crate::deploy::driver::{ProvisionDriver, ProvisionSummary};
use crate::deploy::service::DeploymentService;
use crate::deploy::workspace::Workspace;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::keys::credentials::CredentialMaterializer;
use crate::models::payload::Payload;
use crate::render::templates::{RenderedArtifact, TemplateAssembler};
use crate::storage::settings::Settings;

/// What to deploy
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// JSON payload file
    pub payload_path: PathBuf,

    /// Private key the rendered configuration uses for VM access
    pub private_key_path: PathBuf,

    /// Render and return the artifacts without touching a workspace or the tool
    pub render_only: bool,
}

/// Result of a job
#[derive(Debug)]
pub enum JobOutcome {
    Rendered(Vec<RenderedArtifact>),
    Provisioned(ProvisionSummary),
}

/// Build a deployment service from settings, with a fresh random workspace
pub fn build_service(settings: &Settings) -> DeploymentService {
    let driver = ProvisionDriver::new(
        Arc::new(ShellRunner),
        settings.tool.clone(),
        settings.timeouts.to_step_timeouts(),
    );

    DeploymentService::new(
        Workspace::random(&settings.workspace_base()),
        Box::new(TemplateAssembler::new(settings.template_root.clone())),
        CredentialMaterializer::ssh_keygen(settings.keygen.clone()),
        driver,
        settings.template_selector(),
        settings.provider.clone(),
    )
}

/// Load the payload and run one deployment job
pub async fn run_job(settings: &Settings, request: &JobRequest) -> Result<JobOutcome, DeployError> {
    let raw = File::new(&request.payload_path).read_string().await?;
    let payload = Payload::from_json(&raw)?;
    let service = build_service(settings);

    if request.render_only {
        let prepared = service
            .set_payload(&payload, &request.private_key_path)
            .await?;
        return Ok(JobOutcome::Rendered(prepared.artifacts));
    }

    run_with_cleanup(&service, &payload, &request.private_key_path)
        .await
        .map(JobOutcome::Provisioned)
}

/// Run the deployment, report the workspace on failure, then always clean up
pub async fn run_with_cleanup(
    service: &DeploymentService,
    payload: &Payload,
    private_key_path: &Path,
) -> Result<ProvisionSummary, DeployError> {
    info!("Deploying into {}", service.workspace().path().display());
    let result = service.execute(payload, private_key_path).await;

    if let Err(e) = &result {
        error!("Deployment failed: {}", e);
        if service.workspace().exists().await {
            let files = service.workspace().files().await.unwrap_or_default();
            error!(
                "Workspace {} held {} generated files before cleanup",
                service.workspace().path().display(),
                files.len()
            );
        }
    }

    if let Err(e) = service.cleanup().await {
        warn!(
            "Failed to remove workspace {}: {}",
            service.workspace().path().display(),
            e
        );
    }

    result
}
