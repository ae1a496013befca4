//! Build metadata and identifiers

use serde::{Deserialize, Serialize};

/// Fallback for metadata the build script could not determine
const UNKNOWN: &str = "unknown";

/// Build metadata printed by `--version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}, built {})",
            self.name, self.version, self.git_hash, self.build_time
        )
    }
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or(UNKNOWN).to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or(UNKNOWN).to_string(),
    }
}

/// Random v4 UUID in hyphenated form
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
