//! On-disk locations of the deployer's own files

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Overrides the base directory
pub const HOME_ENV: &str = "STACKABLE_HOME";

/// Settings file, shipped templates and log output under one base directory.
///
/// Workspaces are not kept here: they go under the settings' workspace base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `$STACKABLE_HOME` when set and non-empty, the platform default otherwise
    pub fn from_env() -> Self {
        Self::resolve(std::env::var_os(HOME_ENV).map(PathBuf::from))
    }

    fn resolve(home: Option<PathBuf>) -> Self {
        match home.filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => Self::new(dir),
            None => Self::default(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Templates installed alongside the settings
    pub fn templates_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("terraform_templates"))
    }

    /// Target of `--log-file` when the settings name no log directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/var/lib/stackable");

        #[cfg(not(target_os = "linux"))]
        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stackable");

        Self::new(base_dir)
    }
}
