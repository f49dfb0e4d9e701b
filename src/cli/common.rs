//! Shared plumbing for the commands that talk to a mirror.
//!
//! [`SyncSession`] bundles what `audit`, `sync` and `toggle` all need: the
//! loaded config, the endpoint list, ignore patterns, the canonical game root
//! and a transport.

use crate::cli::CliConfig;
use crate::config::SyncConfig;
use crate::core::SyncError;
use crate::manifest::{FetchedManifest, Manifest, ManifestClient};
use crate::planner::{IgnoreSet, ReconciliationPlan, plan};
use crate::scanner::{HashCache, LocalState, scan_with_concurrency};
use crate::transport::{DefaultTransport, EndpointSet};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Endpoint and ignore overrides accepted by every mirror-facing command.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Mirror to use instead of the configured endpoints (repeatable, in priority order)
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoints: Vec<String>,

    /// Extra glob pattern to leave untouched (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Manifest location relative to each endpoint
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<String>,
}

/// Everything resolved before the first network request.
pub struct SyncSession {
    pub config: SyncConfig,
    pub root: PathBuf,
    pub endpoints: EndpointSet,
    pub ignore: IgnoreSet,
    pub cache_path: PathBuf,
    pub transport: DefaultTransport,
}

/// Result of fetching, scanning and planning.
pub struct Audit {
    pub manifest: Manifest,
    pub endpoint: String,
    pub local: LocalState,
    pub plan: ReconciliationPlan,
}

impl SyncSession {
    pub async fn open(cli: &CliConfig, root: &Path, args: &SourceArgs) -> Result<Self> {
        let mut config = SyncConfig::load(cli.config_path.as_deref()).await?;
        if let Some(path) = &args.manifest_path {
            config.manifest_path.clone_from(path);
        }

        let root = canonical_root(root).await?;
        let endpoints = config.endpoint_set(&args.endpoints)?;
        let ignore = IgnoreSet::new(config.ignore.iter().chain(args.ignore.iter()))?;
        let cache_path = config.cache_file()?;
        let transport = DefaultTransport::new()?;

        tracing::debug!(
            "Session for {} using endpoints {}",
            root.display(),
            endpoints.describe()
        );

        Ok(Self {
            config,
            root,
            endpoints,
            ignore,
            cache_path,
            transport,
        })
    }

    /// Fetch the manifest, trying endpoints in order. The endpoint that
    /// answered becomes preferred for downloads.
    pub async fn fetch_manifest(&mut self) -> Result<FetchedManifest> {
        let client = ManifestClient::new(self.transport.clone(), self.config.fetch_options());
        client.fetch(&mut self.endpoints).await
    }

    /// Scan the root through the persisted hash cache and save it back.
    ///
    /// Failing to save only costs re-hashing next time, so it is logged.
    pub async fn scan(&self) -> Result<LocalState> {
        let mut cache = HashCache::load(&self.cache_path, &self.root).await;
        let local = scan_with_concurrency(&self.root, &mut cache, self.config.concurrency).await?;
        if let Err(e) = cache.save(&self.cache_path).await {
            tracing::warn!("Could not save hash cache: {e:#}");
        }
        Ok(local)
    }

    /// Fetch, scan and plan. Read-only apart from the hash cache.
    pub async fn audit(&mut self) -> Result<Audit> {
        let fetched = self.fetch_manifest().await?;
        let local = self.scan().await?;
        let plan = plan(&local, &fetched.manifest, &self.ignore);
        Ok(Audit {
            manifest: fetched.manifest,
            endpoint: fetched.endpoint,
            local,
            plan,
        })
    }
}

async fn canonical_root(root: &Path) -> Result<PathBuf> {
    let canonical = tokio::fs::canonicalize(root).await.map_err(|e| SyncError::FileSystemError {
        operation: "open root".to_string(),
        path: root.display().to_string(),
        reason: e.to_string(),
    })?;
    let metadata = tokio::fs::metadata(&canonical)
        .await
        .with_context(|| format!("Failed to read {}", canonical.display()))?;
    if !metadata.is_dir() {
        return Err(SyncError::FileSystemError {
            operation: "open root".to_string(),
            path: canonical.display().to_string(),
            reason: "not a directory".to_string(),
        }
        .into());
    }
    Ok(canonical)
}

/// Human-readable byte count.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Print a plan one line per operation, followed by a summary line.
pub fn print_plan(plan: &ReconciliationPlan) {
    for entry in &plan.to_download {
        println!("  {} {} ({})", "download".green(), entry.path, format_bytes(entry.size_bytes));
    }
    for entry in &plan.to_update {
        println!("  {} {} ({})", "update  ".cyan(), entry.path, format_bytes(entry.size_bytes));
    }
    for path in &plan.to_enable {
        println!("  {} {path}", "enable  ".blue());
    }
    for path in &plan.to_disable {
        println!("  {} {path}", "disable ".yellow());
    }
    for path in &plan.to_delete {
        println!("  {} {path}", "delete  ".red());
    }
    for path in &plan.skipped {
        println!("  {} {path}", "skipped ".dimmed());
    }

    if plan.is_converged() {
        println!("{} {} files up to date", "✓".green(), plan.up_to_date.len());
    } else {
        println!(
            "{} operations ({} to download), {} up to date, {} skipped",
            plan.total_operations(),
            format_bytes(plan.download_bytes()),
            plan.up_to_date.len(),
            plan.skipped.len()
        );
    }
}
