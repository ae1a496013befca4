//! Flat template context built from a deployment payload
//!
//! Every payload section lands at the top level of one mapping so templates
//! can refer to `region`, `domain`, `repo_name` and so on directly. The only
//! nested value is `flex`, the compute sizing record.
//!
//! Templates detect "no cloud compute requested" by the absence of the Oracle
//! keys, so an absent `oracle_cloud` section contributes nothing at all.

use secrecy::ExposeSecret;
use serde_json::{Map, Value};

use crate::errors::DeployError;
use crate::keys::credentials::{CredentialPaths, KeyMaterial};
use crate::models::payload::{FlexShape, Payload};

/// Key holding the compute sizing record
pub const FLEX_KEY: &str = "flex";

/// Keys contributed by the Oracle Cloud section
pub const ORACLE_KEYS: [&str; 6] = [
    "tenancy_ocid",
    "user_ocid",
    "fingerprint",
    "region",
    "compartment_ocid",
    FLEX_KEY,
];

/// Key/value mapping handed to the template engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value of `key`, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Insert a new key. Sections use disjoint names, so a repeated key is a bug.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Result<(), DeployError> {
        if self.values.contains_key(key) {
            return Err(DeployError::Internal(format!(
                "Template context key '{}' set twice",
                key
            )));
        }
        self.values.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Add key file locations and contents. Paths are stored as plain strings.
    pub fn insert_credentials(
        &mut self,
        paths: &CredentialPaths,
        keys: &KeyMaterial,
    ) -> Result<(), DeployError> {
        let private_path = paths.private_key.to_string_lossy().into_owned();
        let public_path = paths.public_key.to_string_lossy().into_owned();

        self.insert("pem_path", private_path.clone())?;
        self.insert("private_pem_path", private_path)?;
        self.insert("public_pem_path", public_path)?;
        self.insert("private_key", keys.private_key.expose_secret())?;
        self.insert("public_key", keys.public_key.as_str())?;
        Ok(())
    }

    pub fn to_tera(&self) -> tera::Context {
        let mut context = tera::Context::new();
        for (key, value) in &self.values {
            context.insert(key.as_str(), value);
        }
        context
    }
}

/// Flatten a payload into a template context.
///
/// Merge order: Oracle Cloud fields, `flex`, Cloudflare fields, GitHub fields,
/// instance settings. Credentials are added separately once materialized.
pub fn flatten(payload: &Payload) -> Result<Context, DeployError> {
    let mut context = Context::new();

    if let Some(oci) = &payload.oracle_cloud {
        context.insert("tenancy_ocid", oci.tenancy_ocid.as_str())?;
        context.insert("user_ocid", oci.user_ocid.as_str())?;
        context.insert("fingerprint", oci.fingerprint.as_str())?;
        context.insert("region", oci.region.as_str())?;
        context.insert("compartment_ocid", oci.compartment_ocid.as_str())?;

        let flex = match &oci.flex_shape {
            Some(shape) => shape.to_value(),
            None => FlexShape::default().to_value(),
        };
        context.insert(FLEX_KEY, flex)?;
    }

    let cloudflare = &payload.cloudflare;
    context.insert("cf_api_token", cloudflare.cf_api_token.expose_secret())?;
    context.insert("cf_account_id", cloudflare.cf_account_id.as_str())?;
    context.insert("cf_zone_id", cloudflare.cf_zone_id.as_str())?;
    context.insert("domain", cloudflare.domain.as_str())?;

    let github = &payload.github;
    context.insert("github_token", github.github_token.expose_secret())?;
    context.insert("github_owner", github.github_owner.as_str())?;
    context.insert("repo_name", github.repo_name.as_str())?;
    context.insert("docker_image", github.docker_image.as_str())?;

    context.insert("instance_name", payload.instance_name.as_str())?;
    context.insert("vm_username", payload.vm_username.as_str())?;
    context.insert("vm_password", payload.vm_password.expose_secret())?;

    Ok(context)
}
