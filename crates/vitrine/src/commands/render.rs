//! One-shot preview rendering.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vitrine_preview::{render_document, Orchestrator, PageOptions, PreviewState};

use crate::config::load_config;

/// Run the render command.
pub async fn run(config_path: &Path, file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;

    let source = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut orchestrator = Orchestrator::new(config.preview_config());
    let state = orchestrator.update(&source).clone();

    match &state {
        PreviewState::Ready(mounted) => match &mounted.fault {
            Some(fault) => tracing::warn!("Mounted with a render fault: {}", fault),
            None => tracing::info!("Rendered {} component preview", mounted.kind),
        },
        PreviewState::Failed(report) => tracing::warn!("Preview failed: {}", report.failure),
        PreviewState::Loading => {}
    }

    let options = PageOptions {
        title: config.preview.title.clone(),
        live_script: None,
    };
    let document = render_document(&state, &options);

    match output {
        Some(path) => {
            fs::write(&path, document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{document}"),
    }

    Ok(())
}
