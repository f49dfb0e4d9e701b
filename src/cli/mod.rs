//! Command-line interface for modsync.
//!
//! Each command lives in its own module with a clap `Args` struct and an
//! `execute` method taking the shared [`CliConfig`].
//!
//! # Commands
//!
//! ## Client
//! - `audit` - Show what a sync would change, without changing anything
//! - `sync` - Download, update, enable, disable and delete until the tree matches
//! - `toggle` - Enable or disable an optional component and everything tied to it
//!
//! ## Server
//! - `manifest build` - Hash a mirror directory and publish its manifest
//!
//! ## Maintenance
//! - `cache show|clear` - Inspect or drop the digest cache
//!
//! # Typical session
//!
//! ```bash
//! modsync audit ~/games/client
//! modsync sync ~/games/client
//! modsync toggle ~/games/client mods/minimap.jar --disable
//! ```
//!
//! # Configuration
//!
//! Settings come from `~/.modsync/config.toml`, or the file named by
//! `--config` / `MODSYNC_CONFIG`. Command-line flags such as `--endpoint`
//! override it for a single run.

mod audit;
mod cache;
pub mod common;
mod manifest;
mod sync;
mod toggle;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime options shared by every command.
///
/// Built once from the global flags so commands never read them from the
/// process environment themselves.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Only errors are printed
    pub quiet: bool,

    /// Hide progress bars
    pub no_progress: bool,

    /// Config file given with `--config`
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_level: "warn".to_string(),
            ..Self::default()
        }
    }

    /// Log filter to install: `RUST_LOG` when set, the flag-derived level otherwise.
    #[must_use]
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Keep a game directory in sync with a mirror's manifest.
#[derive(Parser, Debug)]
#[command(
    name = "modsync",
    about = "Keep a game client directory in sync with a published manifest",
    version,
    long_about = "modsync downloads, updates and removes files so that a local game directory matches the \
                  manifest published by a mirror, while respecting optional components the user has disabled."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output (same as RUST_LOG=debug)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of ~/.modsync/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable progress bars (also MODSYNC_NO_PROGRESS)
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a directory with the manifest and print the plan
    Audit(audit::AuditCommand),

    /// Apply the plan so the directory matches the manifest
    Sync(sync::SyncCommand),

    /// Enable or disable an optional component with its dependencies
    Toggle(toggle::ToggleCommand),

    /// Manifest publishing tools
    Manifest(manifest::ManifestCommand),

    /// Manage the digest cache
    Cache(cache::CacheCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            quiet: self.quiet,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Audit(cmd) => cmd.execute(&config).await,
            Commands::Sync(cmd) => cmd.execute(&config).await,
            Commands::Toggle(cmd) => cmd.execute(&config).await,
            Commands::Manifest(cmd) => cmd.execute(&config).await,
            Commands::Cache(cmd) => cmd.execute(&config).await,
        }
    }
}
