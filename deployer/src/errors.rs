//! Error types for the Stackable deployer

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Failed to derive public key from {path}: {reason}")]
    KeyDerivationError { path: String, reason: String },

    #[error("Failed to read key content from {path}: {source}")]
    KeyReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template not found: {name} (looked in {path})")]
    TemplateNotFoundError { name: String, path: String },

    #[error("Failed to render template '{template}'{}: {message}", render_expression(.expression))]
    TemplateRenderError {
        template: String,
        expression: Option<String>,
        message: String,
    },

    #[error("Provisioning init failed (exit code {code}): {stderr}{}", render_stdout(.stdout))]
    ProvisionInitError {
        stdout: String,
        stderr: String,
        code: i32,
    },

    #[error("Provisioning plan failed (exit code {code}): {stderr}{}", render_stdout(.stdout))]
    ProvisionPlanError {
        stdout: String,
        stderr: String,
        code: i32,
    },

    #[error("Provisioning apply failed (exit code {code}): {stderr}{}", render_stdout(.stdout))]
    ProvisionApplyError {
        stdout: String,
        stderr: String,
        code: i32,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn render_expression(expression: &Option<String>) -> String {
    match expression {
        Some(expr) => format!(" at `{}`", expr),
        None => String::new(),
    }
}

fn render_stdout(stdout: &str) -> String {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        String::new()
    } else {
        format!("\n--- stdout ---\n{}", stdout)
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}
