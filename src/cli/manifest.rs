//! Server-side tooling: publish a manifest for a mirror directory.
//!
//! ```bash
//! modsync manifest build --required srv/core --optional srv/extras \
//!     --format-version 2024.11.3 -o srv/launcher/manifest
//! ```

use crate::cli::CliConfig;
use crate::constants::DEFAULT_LOCATOR_PREFIX;
use crate::manifest::{Manifest, ManifestBuilder};
use crate::utils::fs::atomic_write_async;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ManifestCommand {
    #[command(subcommand)]
    command: ManifestSubcommand,
}

#[derive(Subcommand, Debug)]
enum ManifestSubcommand {
    /// Hash two directories and write the manifest describing them
    Build(BuildArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Directory whose files every client must have
    #[arg(long, value_name = "DIR")]
    required: PathBuf,

    /// Directory of components clients may switch off
    #[arg(long, value_name = "DIR")]
    optional: Option<PathBuf>,

    /// Version string published in the manifest
    #[arg(long, value_name = "VERSION")]
    format_version: String,

    /// Prefix prepended to each path to form its download locator
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_LOCATOR_PREFIX)]
    locator_prefix: String,

    /// Existing manifest to copy dependsOn and conflictWith relations from
    #[arg(long, value_name = "FILE")]
    relations_from: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl ManifestCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        match self.command {
            ManifestSubcommand::Build(args) => args.execute(cli).await,
        }
    }
}

impl BuildArgs {
    async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut builder = ManifestBuilder::new(&self.format_version)
            .required_dir(&self.required)
            .locator_prefix(&self.locator_prefix);
        if let Some(optional) = &self.optional {
            builder = builder.optional_dir(optional);
        }
        if let Some(previous) = &self.relations_from {
            let bytes = tokio::fs::read(previous)
                .await
                .with_context(|| format!("Failed to read {}", previous.display()))?;
            let previous = Manifest::from_json(&bytes, &previous.display().to_string())?;
            builder = builder.relations_from(&previous);
        }

        let manifest = builder.build().await?;
        let json = manifest.to_json_pretty()?;

        match &self.output {
            Some(path) => {
                atomic_write_async(path, json.into_bytes())
                    .await
                    .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
                if !cli.quiet {
                    eprintln!(
                        "{} Wrote {} ({} required, {} optional)",
                        "✓".green(),
                        path.display(),
                        manifest.required_entries.len(),
                        manifest.optional_entries.len()
                    );
                }
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}
