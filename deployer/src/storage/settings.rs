//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deploy::fsm::StepTimeouts;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::render::templates::{TemplateSelector, MAIN_TEMPLATE};

/// Overrides the template root directory
pub const TEMPLATE_ROOT_ENV: &str = "STACKABLE_TEMPLATE_ROOT";

/// Overrides the provisioning tool binary
pub const TOOL_ENV: &str = "STACKABLE_TOOL";

/// Deployer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Root of the template tree
    #[serde(default = "default_template_root")]
    pub template_root: PathBuf,

    /// Main template, relative to `template_root`
    #[serde(default = "default_main_template")]
    pub main_template: String,

    /// Provider template to render
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Parent directory of the per-deployment workspaces (system temp dir when unset)
    #[serde(default)]
    pub workspace_base: Option<PathBuf>,

    /// Provisioning tool binary
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Public key derivation binary
    #[serde(default = "default_keygen")]
    pub keygen: String,

    /// Step timeouts
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

fn default_template_root() -> PathBuf {
    PathBuf::from("terraform_templates")
}

fn default_main_template() -> String {
    MAIN_TEMPLATE.to_string()
}

fn default_provider() -> String {
    "oracle".to_string()
}

fn default_tool() -> String {
    "terraform".to_string()
}

fn default_keygen() -> String {
    "ssh-keygen".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            template_root: default_template_root(),
            main_template: default_main_template(),
            provider: default_provider(),
            workspace_base: None,
            tool: default_tool(),
            keygen: default_keygen(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub async fn load(file: &File) -> Result<Self, DeployError> {
        let settings: Settings = file.read_json().await.map_err(|e| {
            DeployError::ConfigError(format!(
                "Unable to read settings file {}: {}",
                file.path().display(),
                e
            ))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if self.tool.trim().is_empty() {
            return Err(DeployError::ConfigError("tool must not be empty".to_string()));
        }
        if self.provider.trim().is_empty() {
            return Err(DeployError::ConfigError("provider must not be empty".to_string()));
        }
        self.timeouts.validate()
    }

    /// Apply `STACKABLE_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = lookup(TEMPLATE_ROOT_ENV) {
            debug!("Template root overridden by {}", TEMPLATE_ROOT_ENV);
            self.template_root = PathBuf::from(root);
        }
        if let Some(tool) = lookup(TOOL_ENV) {
            debug!("Provisioning tool overridden by {}", TOOL_ENV);
            self.tool = tool;
        }
    }

    /// Directory new workspaces are created in
    pub fn workspace_base(&self) -> PathBuf {
        self.workspace_base
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn template_selector(&self) -> TemplateSelector {
        TemplateSelector {
            main_template: self.main_template.clone(),
            ..TemplateSelector::default()
        }
    }
}

/// Step timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_init_secs")]
    pub init_secs: u64,

    #[serde(default = "default_destroy_secs")]
    pub destroy_secs: u64,

    #[serde(default = "default_plan_secs")]
    pub plan_secs: u64,

    #[serde(default = "default_apply_secs")]
    pub apply_secs: u64,
}

fn default_init_secs() -> u64 {
    120
}

fn default_destroy_secs() -> u64 {
    600
}

fn default_plan_secs() -> u64 {
    300
}

fn default_apply_secs() -> u64 {
    1200
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            init_secs: default_init_secs(),
            destroy_secs: default_destroy_secs(),
            plan_secs: default_plan_secs(),
            apply_secs: default_apply_secs(),
        }
    }
}

impl TimeoutSettings {
    fn validate(&self) -> Result<(), DeployError> {
        let all = [
            ("init_secs", self.init_secs),
            ("destroy_secs", self.destroy_secs),
            ("plan_secs", self.plan_secs),
            ("apply_secs", self.apply_secs),
        ];
        for (name, secs) in all {
            if secs == 0 {
                return Err(DeployError::ConfigError(format!(
                    "timeouts.{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn to_step_timeouts(&self) -> StepTimeouts {
        StepTimeouts {
            init: Duration::from_secs(self.init_secs),
            destroy: Duration::from_secs(self.destroy_secs),
            plan: Duration::from_secs(self.plan_secs),
            apply: Duration::from_secs(self.apply_secs),
        }
    }
}
