//! Media Renamer CLI
//!
//! Matches loosely named episode files against canonical episode lists and
//! writes a rename plan.

use clap::Parser;
use media_renamer::cli::{
    args::{CacheAction, Cli, Commands},
    commands::{cache, plan},
};
use media_renamer::models::config::{load_config, load_config_from};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };

    match cli.command {
        Commands::Plan(args) => {
            plan::plan(&args, config).await?;
        }

        Commands::Cache { action } => match action {
            CacheAction::Purge => {
                cache::purge(&config).await?;
            }
        },
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("media_renamer=debug")
    } else {
        EnvFilter::new("media_renamer=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
