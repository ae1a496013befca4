//! Per-deployment working directory

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::utils::generate_uuid;

/// Name prefix of generated workspace directories
pub const WORKSPACE_PREFIX: &str = "tfjob";

/// Mode of the workspace directory. Rendered files carry credentials.
pub const WORKSPACE_MODE: u32 = 0o700;

/// Directory holding the generated files for one deployment attempt.
///
/// The directory is created on the first write and removed by `destroy`,
/// which is safe to call any number of times.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: Dir,
}

impl Workspace {
    /// Workspace at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            dir: Dir::new(path),
        }
    }

    /// Workspace with a random, non-guessable name under `base`
    pub fn random(base: &Path) -> Self {
        Self::new(base.join(format!("{}-{}", WORKSPACE_PREFIX, generate_uuid())))
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub async fn exists(&self) -> bool {
        self.dir.exists().await
    }

    /// Create the directory, owner-only, if missing
    pub async fn ensure(&self) -> Result<PathBuf, DeployError> {
        self.dir.create_with_mode(WORKSPACE_MODE).await?;
        Ok(self.dir.path().to_path_buf())
    }

    /// Write `content` to `name` inside the workspace and set its mode
    pub async fn write(&self, name: &str, content: &str, mode: u32) -> Result<PathBuf, DeployError> {
        let relative = Path::new(name);
        let valid = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(DeployError::ValidationError(format!(
                "Invalid workspace file name: {}",
                name
            )));
        }

        self.ensure().await?;
        let file = self.dir.file(name);
        file.write_with_mode(content, mode).await?;
        file.set_mode(mode).await?;

        debug!("Wrote {} ({:o})", file.path().display(), mode);
        Ok(file.path().to_path_buf())
    }

    /// Files currently in the workspace
    pub async fn files(&self) -> Result<Vec<PathBuf>, DeployError> {
        if !self.exists().await {
            return Ok(Vec::new());
        }
        self.dir.list_files().await
    }

    /// Remove the workspace and everything in it
    pub async fn destroy(&self) -> Result<(), DeployError> {
        self.dir.delete().await?;
        info!("Removed workspace {}", self.path().display());
        Ok(())
    }
}
