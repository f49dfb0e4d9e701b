//! Report what a sync would change without touching the tree.
//!
//! ```bash
//! modsync audit ~/games/client
//! modsync audit ~/games/client --json
//! modsync audit ~/games/client --endpoint file:///srv/mirror --ignore 'config/'
//! ```

use crate::cli::CliConfig;
use crate::cli::common::{SourceArgs, SyncSession, print_plan};
use crate::planner::ReconciliationPlan;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AuditCommand {
    /// Game directory to compare against the manifest
    pub root: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditOutput<'a> {
    format_version: &'a str,
    aggregate_digest: Option<&'a str>,
    endpoint: &'a str,
    local_files: usize,
    plan: &'a ReconciliationPlan,
}

impl AuditCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut session = SyncSession::open(cli, &self.root, &self.source).await?;
        let audit = session.audit().await?;

        if self.json {
            let output = AuditOutput {
                format_version: &audit.manifest.format_version,
                aggregate_digest: audit.manifest.aggregate_digest.as_deref(),
                endpoint: &audit.endpoint,
                local_files: audit.local.len(),
                plan: &audit.plan,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!(
            "{} {} from {} ({} local files)",
            "Manifest".bold(),
            audit.manifest.format_version,
            audit.endpoint,
            audit.local.len()
        );
        print_plan(&audit.plan);
        Ok(())
    }
}
