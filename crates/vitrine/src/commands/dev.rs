//! Live preview server command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use vitrine_server::{PreviewServer, PreviewServerConfig};

use crate::config::load_config;

/// Run the dev server.
pub async fn run(config_path: &Path, file: PathBuf, port: Option<u16>, open: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let port = port.unwrap_or(config.server.port);

    tracing::info!("Starting preview server on port {}", port);

    let server_config = PreviewServerConfig {
        snippet_path: file,
        port,
        host: config.server.host.clone(),
        open: open && config.server.open,
        title: config.preview.title.clone(),
        preview: config.preview_config(),
    };

    PreviewServer::new(server_config).start().await?;

    Ok(())
}
