//! Enable or disable an optional component together with everything tied to it.
//!
//! Enabling activates the component's dependencies first and disables active
//! components that conflict with any of them. Dependencies that are not
//! installed at all are downloaded before any rename happens. Disabling
//! deactivates every active dependent first.
//!
//! ```bash
//! modsync toggle ~/games/client mods/minimap.jar --enable
//! modsync toggle ~/games/client mods/minimap.jar --disable --dry-run
//! ```

use crate::cli::CliConfig;
use crate::cli::common::{SourceArgs, SyncSession};
use crate::core::{ComponentState, SyncError};
use crate::executor::{DownloadExecutor, OutcomeStatus};
use crate::planner::ReconciliationPlan;
use crate::resolver::{ComponentGraph, DependencyClosure, ToggleRequest};
use crate::tree;
use anyhow::{Result, anyhow};
use clap::{ArgGroup, Args};
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("state").required(true).args(["enable", "disable"])))]
pub struct ToggleCommand {
    /// Game directory
    pub root: PathBuf,

    /// Component id, i.e. the manifest path of an optional entry
    pub component: String,

    /// Make the component active
    #[arg(long)]
    pub enable: bool,

    /// Make the component inactive
    #[arg(long)]
    pub disable: bool,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the changes and stop
    #[arg(long)]
    pub dry_run: bool,
}

impl ToggleCommand {
    fn request(&self) -> ToggleRequest {
        ToggleRequest {
            component_id: self.component.clone(),
            desired_state: if self.enable {
                ComponentState::Active
            } else {
                ComponentState::Inactive
            },
        }
    }

    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut session = SyncSession::open(cli, &self.root, &self.source).await?;
        let fetched = session.fetch_manifest().await?;
        let graph = ComponentGraph::from_manifest(&fetched.manifest)?;

        let states = tree::component_states(&session.root, graph.components()).await?;
        let closure = graph.toggle(&self.request(), &states)?;

        if closure.is_empty() && closure.missing.is_empty() {
            println!("{} {} is already {}", "✓".green(), self.component, self.request().desired_state);
            return Ok(());
        }

        print_closure(&closure);
        if self.dry_run {
            return Ok(());
        }

        if !closure.missing.is_empty() {
            let to_download = closure
                .missing
                .iter()
                .map(|id| {
                    fetched.manifest.entry(id).cloned().ok_or_else(|| {
                        anyhow::Error::from(SyncError::UnknownComponent {
                            id: id.clone(),
                            suggestion: graph.suggest(id),
                        })
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let plan = ReconciliationPlan {
                to_download,
                ..ReconciliationPlan::default()
            };

            let executor = DownloadExecutor::new(
                session.transport.clone(),
                session.root.clone(),
                session.config.executor_options(),
            );
            let report = executor.apply(&plan, &session.endpoints, &CancellationToken::new(), None).await;
            if let Some(failure) = report.failures().next() {
                let reason = match &failure.status {
                    OutcomeStatus::Failed(reason) => reason.as_str(),
                    _ => "unknown",
                };
                return Err(anyhow!("Could not download {}: {reason}", failure.path));
            }
        }

        let changed = tree::apply_closure(&session.root, &closure).await?;
        println!(
            "{} {} {} ({} renamed, {} downloaded)",
            "✓".green(),
            self.component,
            self.request().desired_state,
            changed.len(),
            closure.missing.len()
        );
        Ok(())
    }
}

fn print_closure(closure: &DependencyClosure) {
    for id in &closure.disable {
        println!("  {} {id}", "disable ".yellow());
    }
    for id in &closure.missing {
        println!("  {} {id}", "download".green());
    }
    for id in &closure.enable {
        println!("  {} {id}", "enable  ".blue());
    }
}
