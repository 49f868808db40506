//! Vitrine CLI - sandboxed preview of AI-generated UI components.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(about = "Sandboxed preview of AI-generated UI components")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to vitrine.toml config file
    #[arg(short, long, default_value = "vitrine.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a snippet to a standalone HTML preview
    Render {
        /// Snippet source file
        file: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a snippet without mounting it
    Check {
        /// Snippet source file
        file: PathBuf,
    },

    /// Start the live preview server
    Dev {
        /// Snippet source file
        file: PathBuf,

        /// Port to listen on (defaults to config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Render { file, output } => {
            commands::render::run(&cli.config, file, output).await?;
        }
        Commands::Check { file } => {
            commands::check::run(&cli.config, file).await?;
        }
        Commands::Dev {
            file,
            port,
            no_open,
        } => {
            commands::dev::run(&cli.config, file, port, !no_open).await?;
        }
    }

    Ok(())
}
