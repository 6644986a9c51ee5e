//! fsgate: MCP stdio server for sandboxed, gitignore-aware file access.
//!
//! ```bash
//! fsgate --allowed-directories /srv/projects,/home/me/notes
//! ALLOWED_DIRECTORIES=/srv/projects fsgate --max-depth 3
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use fsgate_core::Settings;
use fsgate_server::server::FsServerHandler;

#[derive(Parser, Debug)]
#[command(name = "fsgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server with sandboxed, gitignore-aware filesystem tools")]
struct Args {
    /// Settings file (TOML). Defaults to ~/.config/fsgate/config.toml when present
    #[arg(long, value_name = "FILE", env = "FSGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Directories the server may access; overrides ALLOWED_DIRECTORIES
    #[arg(long, value_delimiter = ',')]
    allowed_directories: Option<Vec<PathBuf>>,

    /// Default depth limit for directory_tree
    #[arg(long)]
    max_depth: Option<usize>,

    /// trace, debug, info, warn or error
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn load_settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load_default()?,
        };
        settings.apply_env();

        if let Some(dirs) = &self.allowed_directories {
            settings.allowed_directories = dirs.clone();
        }
        if let Some(depth) = self.max_depth {
            settings.default_max_depth = depth;
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = args.load_settings()?;
    setup_tracing(&settings);
    if settings.log_level_directive().is_none() {
        warn!("Invalid log level '{}', using info", settings.log_level);
    }

    info!(
        "Starting {} v{}: {} allowed directories, default depth {}",
        settings.server_name,
        env!("CARGO_PKG_VERSION"),
        settings.allowed_directories.len(),
        settings.default_max_depth
    );

    let handler = FsServerHandler::new(&settings).context("Failed to create server handler")?;

    info!("Serving on stdio");
    let service = handler
        .serve(stdio())
        .await
        .context("Failed to start MCP service")?;
    service.waiting().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Logs go to stderr; stdout carries the protocol. RUST_LOG wins over the
/// configured level.
fn setup_tracing(settings: &Settings) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .init();
}
