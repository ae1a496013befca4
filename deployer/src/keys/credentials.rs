//! SSH credential material for the provisioning workspace

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::DeployError;
use crate::filesys::file::File;

/// File name of the private key inside the workspace
pub const PRIVATE_KEY_FILE: &str = "id_rsa";

/// File name of the public key inside the workspace
pub const PUBLIC_KEY_FILE: &str = "id_rsa.pub";

/// Owner read/write only
pub const PRIVATE_KEY_MODE: u32 = 0o600;

/// Owner read/write, everyone else read
pub const PUBLIC_KEY_MODE: u32 = 0o644;

const PRIVATE_KEY_TRAILER: &str = "PRIVATE KEY-----";

/// Text substituted for key content when the key file does not exist.
pub fn placeholder(path: &Path) -> String {
    format!("# SSH key content from {}", path.display())
}

/// Derives a public key from a private key file
#[async_trait]
pub trait KeyDeriver: Send + Sync {
    /// Return the public key for the private key at `private_key`
    async fn derive(&self, private_key: &Path) -> Result<String, DeployError>;
}

/// Public key derivation through `ssh-keygen -y -f <path>`
#[derive(Debug, Clone)]
pub struct SshKeygen {
    program: String,
}

impl SshKeygen {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SshKeygen {
    fn default() -> Self {
        Self::new("ssh-keygen")
    }
}

#[async_trait]
impl KeyDeriver for SshKeygen {
    async fn derive(&self, private_key: &Path) -> Result<String, DeployError> {
        let output = Command::new(&self.program)
            .arg("-y")
            .arg("-f")
            .arg(private_key)
            .output()
            .await
            .map_err(|e| DeployError::KeyDerivationError {
                path: private_key.display().to_string(),
                reason: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(DeployError::KeyDerivationError {
                path: private_key.display().to_string(),
                reason,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Key material embedded in the rendered files and written to the workspace
#[derive(Debug)]
pub struct KeyMaterial {
    pub public_key: String,
    pub private_key: SecretString,
}

/// Locations of the key files a rendered configuration refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl CredentialPaths {
    /// The conventional key file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            private_key: dir.join(PRIVATE_KEY_FILE),
            public_key: dir.join(PUBLIC_KEY_FILE),
        }
    }
}

/// Tighten the private key file to owner read/write only.
///
/// This changes the mode of the caller's file in place. A missing file is
/// left alone so demo runs without a key keep working.
pub async fn tighten_permissions(private_key: &Path) -> Result<(), DeployError> {
    let file = File::new(private_key);
    if !file.exists().await {
        debug!("No private key at {}, skipping chmod", private_key.display());
        return Ok(());
    }
    file.set_mode(PRIVATE_KEY_MODE).await
}

/// Read the private key, dropping anything after the end delimiter.
pub async fn read_private_key(private_key: &Path) -> Result<String, DeployError> {
    match fs::read_to_string(private_key).await {
        Ok(raw) => Ok(trim_private_key(&raw).to_string()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Private key {} not found, using placeholder", private_key.display());
            Ok(placeholder(private_key))
        }
        Err(source) => Err(DeployError::KeyReadError {
            path: private_key.display().to_string(),
            source,
        }),
    }
}

/// Cut PEM text right after `-----END ... PRIVATE KEY-----`.
///
/// Text without a recognizable BEGIN/END pair is returned trimmed.
pub fn trim_private_key(raw: &str) -> &str {
    let text = raw.trim();

    let Some(begin) = text.find("-----BEGIN ") else {
        return text;
    };
    let Some(header) = text[begin..].find(PRIVATE_KEY_TRAILER).map(|i| begin + i) else {
        return text;
    };
    if text[begin..header].contains('\n') {
        return text;
    }
    let Some(end) = text[header..].find("-----END ").map(|i| header + i) else {
        return text;
    };
    let Some(close) = text[end..].find(PRIVATE_KEY_TRAILER).map(|i| end + i) else {
        return text;
    };
    if text[end..close].contains('\n') {
        return text;
    }

    &text[..close + PRIVATE_KEY_TRAILER.len()]
}

/// Produces the public/private key pair for a deployment
#[derive(Clone)]
pub struct CredentialMaterializer {
    deriver: Arc<dyn KeyDeriver>,
}

impl CredentialMaterializer {
    pub fn new(deriver: Arc<dyn KeyDeriver>) -> Self {
        Self { deriver }
    }

    /// Materializer backed by the given `ssh-keygen` binary
    pub fn ssh_keygen(program: impl Into<String>) -> Self {
        Self::new(Arc::new(SshKeygen::new(program)))
    }

    /// Derive the public key text. Missing key files yield the placeholder.
    pub async fn derive_public_key(&self, private_key: &Path) -> Result<String, DeployError> {
        if !File::new(private_key).exists().await {
            warn!("Private key {} not found, using placeholder public key", private_key.display());
            return Ok(placeholder(private_key));
        }

        let public_key = self.deriver.derive(private_key).await?;
        Ok(public_key.trim().to_string())
    }

    /// Tighten the key file's mode, then derive and read both halves.
    ///
    /// The source file's permissions are changed to `0600` as a side effect.
    pub async fn materialize(&self, private_key: &Path) -> Result<KeyMaterial, DeployError> {
        tighten_permissions(private_key).await?;
        let public_key = self.derive_public_key(private_key).await?;
        let private_key = read_private_key(private_key).await?;

        Ok(KeyMaterial {
            public_key,
            private_key: SecretString::from(private_key),
        })
    }
}

impl std::fmt::Debug for CredentialMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialMaterializer").finish_non_exhaustive()
    }
}
