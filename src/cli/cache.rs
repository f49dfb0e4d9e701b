//! Inspect or drop the on-disk digest cache.
//!
//! The cache only saves re-hashing time; clearing it is always safe.

use crate::cli::CliConfig;
use crate::config::SyncConfig;
use crate::scanner::HashCache;
use crate::utils::fs::remove_file_with_retry;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: CacheSubcommand,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommand {
    /// Show where the cache lives and what it covers
    Show,
    /// Delete the cache file
    Clear,
}

impl CacheCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = SyncConfig::load(cli.config_path.as_deref()).await?;
        let path = config.cache_file()?;

        match self.command {
            CacheSubcommand::Show => {
                println!("{} {}", "Cache:".bold(), path.display());
                match HashCache::read(&path).await? {
                    Some(cache) => {
                        println!("{} {}", "Root:".bold(), cache.root());
                        println!("{} {}", "Entries:".bold(), cache.len());
                    }
                    None => println!("{}", "No cache yet".dimmed()),
                }
            }
            CacheSubcommand::Clear => {
                remove_file_with_retry(&path).await?;
                if !cli.quiet {
                    println!("{} Cleared {}", "✓".green(), path.display());
                }
            }
        }
        Ok(())
    }
}
