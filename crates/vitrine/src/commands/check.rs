//! Snippet validation without mounting.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vitrine_preview::Orchestrator;

use crate::config::load_config;

/// Run the check command: transform, load, and resolve, but do not mount.
/// Exits non-zero when the snippet cannot produce a renderable.
pub async fn run(config_path: &Path, file: PathBuf) -> Result<()> {
    let config = load_config(config_path)?;

    let source = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let label = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snippet.tsx")
        .to_string();

    let orchestrator = Orchestrator::new(config.preview_config());
    match orchestrator.inspect(&source, &label) {
        Ok(kind) => {
            tracing::info!("{}: ok ({} component)", file.display(), kind);
            Ok(())
        }
        Err(failure) => {
            if let Some(detail) = &failure.detail {
                tracing::debug!("{detail}");
            }
            anyhow::bail!("{}: {}", file.display(), failure)
        }
    }
}
