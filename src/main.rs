//! modsync binary entry point.

use anyhow::Result;
use clap::Parser;
use modsync_cli::cli;
use modsync_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Logs go to stderr so stdout stays clean for --json and manifest output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(cli.build_config().log_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // Execute the command
    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Convert to user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
