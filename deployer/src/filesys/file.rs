//! File operations

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::DeployError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, DeployError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, DeployError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Write string to file, creating the parent directory if needed
    pub async fn write_string(&self, contents: &str) -> Result<(), DeployError> {
        self.write_with_mode(contents, 0o644).await
    }

    /// Write string to file, creating it with `mode` (e.g. `0o600`).
    ///
    /// A new file never exists with wider permissions than `mode`. An
    /// existing file keeps its bits; follow with `set_mode` to force them.
    pub async fn write_with_mode(&self, contents: &str, mode: u32) -> Result<(), DeployError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options.open(&self.path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Set the Unix permission bits of the file (e.g. `0o600`).
    ///
    /// A no-op on non-Unix platforms.
    pub async fn set_mode(&self, mode: u32) -> Result<(), DeployError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(mode)).await?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        Ok(())
    }

    /// Current Unix permission bits, without the file type bits.
    #[cfg(unix)]
    pub async fn mode(&self) -> Result<u32, DeployError> {
        use std::os::unix::fs::PermissionsExt;
        let meta = fs::metadata(&self.path).await?;
        Ok(meta.permissions().mode() & 0o777)
    }
}
