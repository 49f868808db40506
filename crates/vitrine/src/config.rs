//! vitrine.toml configuration.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use vitrine_preview::PreviewConfig;
use vitrine_sandbox::SandboxConfig;
use vitrine_transform::TransformConfig;

/// Configuration file structure (vitrine.toml).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub preview: PreviewSettings,
    pub transform: TransformConfig,
    pub sandbox: SandboxConfig,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Preview document title
    pub title: String,

    /// Transform-stage timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            title: "Vitrine Preview".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub open: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7700,
            open: true,
        }
    }
}

impl ConfigFile {
    /// Assemble the pipeline configuration.
    pub fn preview_config(&self) -> PreviewConfig {
        PreviewConfig {
            transform: self.transform.clone(),
            sandbox: self.sandbox.clone(),
            timeout_ms: self.preview.timeout_ms,
        }
    }
}

/// Load configuration from the given path if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }
    Ok(ConfigFile::default())
}
