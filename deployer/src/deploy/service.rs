//! Deployment service: payload in, provisioned infrastructure out

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use tracing::info;

use crate::deploy::driver::{ProvisionDriver, ProvisionSummary};
use crate::deploy::workspace::Workspace;
use crate::errors::DeployError;
use crate::keys::credentials::{
    CredentialMaterializer, CredentialPaths, KeyMaterial, PRIVATE_KEY_FILE, PRIVATE_KEY_MODE,
    PUBLIC_KEY_FILE, PUBLIC_KEY_MODE,
};
use crate::models::payload::Payload;
use crate::render::context::flatten;
use crate::render::templates::{RenderedArtifact, TemplateSelector, TemplateSource};

/// Mode of rendered configuration files
pub const ARTIFACT_MODE: u32 = 0o644;

/// Rendered files and the key material they reference
#[derive(Debug)]
pub struct PreparedDeployment {
    pub artifacts: Vec<RenderedArtifact>,
    pub keys: KeyMaterial,
}

/// Runs one deployment attempt against its own workspace
pub struct DeploymentService {
    workspace: Workspace,
    templates: Box<dyn TemplateSource>,
    credentials: CredentialMaterializer,
    driver: ProvisionDriver,
    selector: TemplateSelector,
    provider: String,
}

impl DeploymentService {
    pub fn new(
        workspace: Workspace,
        templates: Box<dyn TemplateSource>,
        credentials: CredentialMaterializer,
        driver: ProvisionDriver,
        selector: TemplateSelector,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            workspace,
            templates,
            credentials,
            driver,
            selector,
            provider: provider.into(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn driver(&self) -> &ProvisionDriver {
        &self.driver
    }

    /// Flatten the payload and render both templates.
    ///
    /// Nothing is written to the workspace. The private key file at
    /// `private_key_path` has its mode tightened to `0600`.
    pub async fn set_payload(
        &self,
        payload: &Payload,
        private_key_path: &Path,
    ) -> Result<PreparedDeployment, DeployError> {
        payload.validate()?;
        let mut context = flatten(payload)?;

        let (main, provider) = self
            .templates
            .assemble(&self.selector, &self.provider)
            .await?;

        let keys = self.credentials.materialize(private_key_path).await?;
        context.insert_credentials(&CredentialPaths::in_dir(self.workspace.path()), &keys)?;

        let artifacts = vec![main.render(&context)?, provider.render(&context)?];
        info!(
            "Rendered {} and {} for provider {}",
            main.name(),
            provider.name(),
            self.provider
        );

        Ok(PreparedDeployment { artifacts, keys })
    }

    /// Write the key pair and the rendered files into the workspace
    pub async fn generate_tf_files(
        &self,
        artifacts: &[RenderedArtifact],
        keys: &KeyMaterial,
    ) -> Result<Vec<PathBuf>, DeployError> {
        let mut written = Vec::with_capacity(artifacts.len() + 2);

        written.push(
            self.workspace
                .write(PRIVATE_KEY_FILE, keys.private_key.expose_secret(), PRIVATE_KEY_MODE)
                .await?,
        );
        written.push(
            self.workspace
                .write(PUBLIC_KEY_FILE, &keys.public_key, PUBLIC_KEY_MODE)
                .await?,
        );

        for artifact in artifacts {
            written.push(
                self.workspace
                    .write(&artifact.file_name, &artifact.content, ARTIFACT_MODE)
                    .await?,
            );
        }

        info!(
            "Generated {} files in {}",
            written.len(),
            self.workspace.path().display()
        );
        Ok(written)
    }

    /// Drive the provisioning tool in the workspace
    pub async fn deploy(&self) -> Result<ProvisionSummary, DeployError> {
        self.driver.run(self.workspace.path()).await
    }

    /// Render, write and provision. Does not clean up.
    pub async fn execute(
        &self,
        payload: &Payload,
        private_key_path: &Path,
    ) -> Result<ProvisionSummary, DeployError> {
        let prepared = self.set_payload(payload, private_key_path).await?;
        self.generate_tf_files(&prepared.artifacts, &prepared.keys)
            .await?;
        self.deploy().await
    }

    /// Remove the workspace. Safe after partial setup and when repeated.
    pub async fn cleanup(&self) -> Result<(), DeployError> {
        self.workspace.destroy().await
    }
}
