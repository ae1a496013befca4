//! Deployment payload models

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::DeployError;

/// Compute shape used when the caller asks for Oracle Cloud without a shape.
pub const DEFAULT_FLEX_SHAPE: &str = "VM.Standard.E2.1.Micro";

/// Default VM instance name
pub const DEFAULT_INSTANCE_NAME: &str = "backend-vm";

/// Default VM login user
pub const DEFAULT_VM_USERNAME: &str = "user";

/// Default VM login password
pub const DEFAULT_VM_PASSWORD: &str = "password";

/// Configuration payload for one deployment.
///
/// Contains settings for Oracle Cloud (optional), Cloudflare DNS, the GitHub
/// repository to deploy, and the VM login.
#[derive(Debug, Deserialize)]
pub struct Payload {
    /// Oracle Cloud settings. When absent no compute resources are rendered.
    #[serde(default)]
    pub oracle_cloud: Option<OracleCloudConfig>,

    /// Cloudflare DNS settings
    pub cloudflare: CloudflareVars,

    /// GitHub repository information
    pub github: GithubVars,

    /// Name of the VM instance
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Username for VM access
    #[serde(default = "default_vm_username")]
    pub vm_username: String,

    /// Password for VM access
    #[serde(default = "default_vm_password")]
    pub vm_password: SecretString,
}

fn default_instance_name() -> String {
    DEFAULT_INSTANCE_NAME.to_string()
}

fn default_vm_username() -> String {
    DEFAULT_VM_USERNAME.to_string()
}

fn default_vm_password() -> SecretString {
    SecretString::from(DEFAULT_VM_PASSWORD)
}

/// Oracle Cloud Infrastructure identity and placement
#[derive(Debug, Clone, Deserialize)]
pub struct OracleCloudConfig {
    pub tenancy_ocid: String,
    pub user_ocid: String,
    pub fingerprint: String,
    pub region: String,
    pub compartment_ocid: String,

    /// Compute sizing. The default micro shape is used when absent.
    #[serde(default)]
    pub flex_shape: Option<FlexShape>,
}

/// Largest CPU count accepted for a flex shape
pub const MAX_OCPUS: f64 = u32::MAX as f64;

/// Compute sizing record
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlexShape {
    #[serde(default = "default_shape")]
    pub shape: String,

    #[serde(default = "default_ocpus")]
    pub ocpus: f64,

    #[serde(default = "default_memory_gb")]
    pub memory_gb: u32,
}

fn default_shape() -> String {
    DEFAULT_FLEX_SHAPE.to_string()
}

fn default_ocpus() -> f64 {
    1.0
}

fn default_memory_gb() -> u32 {
    1
}

impl Default for FlexShape {
    fn default() -> Self {
        Self {
            shape: default_shape(),
            ocpus: default_ocpus(),
            memory_gb: default_memory_gb(),
        }
    }
}

impl FlexShape {
    /// Template value for the shape. Whole CPU counts render as integers.
    pub fn to_value(&self) -> serde_json::Value {
        let whole = self.ocpus.fract() == 0.0 && (0.0..=MAX_OCPUS).contains(&self.ocpus);
        let ocpus = if whole {
            serde_json::Value::from(self.ocpus as u32)
        } else {
            serde_json::Value::from(self.ocpus)
        };

        serde_json::json!({
            "shape": self.shape,
            "ocpus": ocpus,
            "memory_gb": self.memory_gb,
        })
    }
}

/// Cloudflare DNS settings
#[derive(Debug, Deserialize)]
pub struct CloudflareVars {
    pub cf_api_token: SecretString,
    pub cf_account_id: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub cf_zone_id: String,

    /// Public domain. Empty means no DNS record is created.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub domain: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Source repository binding
#[derive(Debug, Deserialize)]
pub struct GithubVars {
    pub github_token: SecretString,
    pub github_owner: String,
    pub repo_name: String,
    pub docker_image: String,
}

impl Payload {
    /// Parse and validate a JSON payload.
    pub fn from_json(raw: &str) -> Result<Self, DeployError> {
        let payload: Payload = serde_json::from_str(raw)
            .map_err(|e| DeployError::ValidationError(format!("Invalid payload: {}", e)))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Check that every required field carries a value.
    pub fn validate(&self) -> Result<(), DeployError> {
        use secrecy::ExposeSecret;

        if let Some(oci) = &self.oracle_cloud {
            require("oracle_cloud.tenancy_ocid", &oci.tenancy_ocid)?;
            require("oracle_cloud.user_ocid", &oci.user_ocid)?;
            require("oracle_cloud.fingerprint", &oci.fingerprint)?;
            require("oracle_cloud.region", &oci.region)?;
            require("oracle_cloud.compartment_ocid", &oci.compartment_ocid)?;

            if let Some(flex) = &oci.flex_shape {
                require("oracle_cloud.flex_shape.shape", &flex.shape)?;
                if !(flex.ocpus.is_finite() && flex.ocpus > 0.0 && flex.ocpus <= MAX_OCPUS) {
                    return Err(DeployError::ValidationError(format!(
                        "oracle_cloud.flex_shape.ocpus must be greater than zero and at most {}",
                        MAX_OCPUS
                    )));
                }
                if flex.memory_gb == 0 {
                    return Err(DeployError::ValidationError(
                        "oracle_cloud.flex_shape.memory_gb must be greater than zero".to_string(),
                    ));
                }
            }
        }

        require("cloudflare.cf_api_token", self.cloudflare.cf_api_token.expose_secret())?;
        require("cloudflare.cf_account_id", &self.cloudflare.cf_account_id)?;

        require("github.github_token", self.github.github_token.expose_secret())?;
        require("github.github_owner", &self.github.github_owner)?;
        require("github.repo_name", &self.github.repo_name)?;
        require("github.docker_image", &self.github.docker_image)?;

        require("instance_name", &self.instance_name)?;
        require("vm_username", &self.vm_username)?;

        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), DeployError> {
    if value.trim().is_empty() {
        return Err(DeployError::ValidationError(format!("{} must not be empty", field)));
    }
    Ok(())
}
