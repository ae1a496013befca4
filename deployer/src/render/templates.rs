//! Terraform template loading and rendering
//!
//! Templates live under a configured root:
//!
//! ```text
//! <root>/main.tf.j2
//! <root>/providers/<provider>_template.tf.j2
//! ```
//!
//! They are read from disk on every `assemble` call so edits show up without
//! restarting the process.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tera::Tera;
use tokio::fs;
use tracing::debug;

use crate::errors::DeployError;
use crate::render::context::Context;

/// Default main template file name
pub const MAIN_TEMPLATE: &str = "main.tf.j2";

/// Directory holding one template per provider
pub const PROVIDERS_DIR: &str = "providers";

/// File name of the provider template for `provider`
pub fn provider_template_name(provider: &str) -> String {
    format!("{}_template.tf.j2", provider)
}

/// Which template pair to load and what to call the rendered files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSelector {
    /// Main template, relative to the template root
    pub main_template: String,

    /// Output file name for the main template
    pub main_output: String,

    /// Output file name for the provider template
    pub provider_output: String,
}

impl Default for TemplateSelector {
    fn default() -> Self {
        Self {
            main_template: MAIN_TEMPLATE.to_string(),
            main_output: "main.tf".to_string(),
            provider_output: "provider.tf".to_string(),
        }
    }
}

/// Rendered text and the file name it is written under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub file_name: String,
    pub content: String,
}

/// A template ready to render against a context
pub trait RenderTemplate: Send + Sync {
    /// Template name, used in error messages
    fn name(&self) -> &str;

    /// File name of the rendered output
    fn output_name(&self) -> &str;

    fn render(&self, context: &Context) -> Result<RenderedArtifact, DeployError>;
}

/// Source of the main/provider template pair
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn assemble(
        &self,
        selector: &TemplateSelector,
        provider: &str,
    ) -> Result<(Box<dyn RenderTemplate>, Box<dyn RenderTemplate>), DeployError>;
}

/// A Tera template loaded from disk
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    output: String,
    source: String,
}

impl Template {
    pub fn new(name: impl Into<String>, output: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl RenderTemplate for Template {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_name(&self) -> &str {
        &self.output
    }

    fn render(&self, context: &Context) -> Result<RenderedArtifact, DeployError> {
        let mut tera = Tera::default();
        tera.add_raw_template(&self.name, &self.source)
            .map_err(|e| render_error(&self.name, &e))?;

        let content = tera
            .render(&self.name, &context.to_tera())
            .map_err(|e| render_error(&self.name, &e))?;

        Ok(RenderedArtifact {
            file_name: self.output.clone(),
            content,
        })
    }
}

fn render_error(template: &str, err: &tera::Error) -> DeployError {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }

    DeployError::TemplateRenderError {
        template: template.to_string(),
        expression: offending_expression(&message),
        message,
    }
}

/// Tera quotes the failing variable or expression in backticks.
fn offending_expression(message: &str) -> Option<String> {
    let start = message.find('`')? + 1;
    let len = message[start..].find('`')?;
    let expr = message[start..start + len].trim();
    (!expr.is_empty()).then(|| expr.to_string())
}

/// Loads templates from a directory tree
#[derive(Debug, Clone)]
pub struct TemplateAssembler {
    root: PathBuf,
}

impl TemplateAssembler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the provider template for `provider`
    pub fn provider_path(&self, provider: &str) -> PathBuf {
        self.root
            .join(PROVIDERS_DIR)
            .join(provider_template_name(provider))
    }

    async fn load(&self, name: &str, path: &Path, output: &str) -> Result<Template, DeployError> {
        debug!("Loading template {} from {}", name, path.display());
        match fs::read_to_string(path).await {
            Ok(source) => Ok(Template::new(name, output, source)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DeployError::TemplateNotFoundError {
                name: name.to_string(),
                path: path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TemplateSource for TemplateAssembler {
    async fn assemble(
        &self,
        selector: &TemplateSelector,
        provider: &str,
    ) -> Result<(Box<dyn RenderTemplate>, Box<dyn RenderTemplate>), DeployError> {
        let provider_path = self.provider_path(provider);
        let valid_name = !provider.is_empty()
            && provider
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(DeployError::TemplateNotFoundError {
                name: provider.to_string(),
                path: provider_path.display().to_string(),
            });
        }

        let main = self
            .load(
                &selector.main_template,
                &self.root.join(&selector.main_template),
                &selector.main_output,
            )
            .await?;
        let provider_template = self
            .load(
                &format!("{}/{}", PROVIDERS_DIR, provider_template_name(provider)),
                &provider_path,
                &selector.provider_output,
            )
            .await?;

        Ok((Box::new(main), Box::new(provider_template)))
    }
}
