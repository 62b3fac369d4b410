//! cli
//!
//! Command-line interface layer for gitprov.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and merge it with flags (flags win)
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and hands a
//! [`Context`] to the handlers in [`commands`], which call into
//! [`crate::git`]. `anyhow` is used only at this layer.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::config::Config;

/// Shared state for command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration (defaults when no file exists)
    pub config: Config,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`, after logging has
/// been initialized from `cli.debug`.
pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        debug!(path = %path.display(), "loaded configuration");
    }

    let ctx = Context { config, cancel };
    commands::dispatch(cli.command, &ctx).await
}
