//! Configuration loaded from `~/.aems/config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use aems_crypto::{CipherKind, EnvelopeFormat};
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AemsConfig {
    /// Block cipher provider: "aes-256" or "aems"
    pub cipher: CipherKind,
    /// Envelope armor: "standard" (base64 tokens, base85 records) or "hex"
    pub envelope: EnvelopeFormat,
    /// Log filter used when RUST_LOG is unset (default: warn)
    pub log_level: String,
    /// Print the banner when the interactive session starts
    pub banner: bool,
}

impl Default for AemsConfig {
    fn default() -> Self {
        Self {
            cipher: CipherKind::default(),
            envelope: EnvelopeFormat::default(),
            log_level: "warn".to_string(),
            banner: true,
        }
    }
}

impl AemsConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".aems").join("config.toml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. The default path is optional; when it is
    /// missing the built-in defaults apply.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }
}
