//! filtersync - keeps URL-backed rule lists fresh on disk.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use filtersync::cli::{Cli, Commands};
use filtersync::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run => commands::run::run(&cli.config).await,
        Commands::Add { name, url } => commands::filter::add(&name, &url, &cli.config).await,
        Commands::Remove { url } => commands::filter::remove(&url, &cli.config).await,
        Commands::Modify {
            url,
            name,
            new_url,
            enable,
            disable,
        } => {
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::filter::modify(&url, name, new_url, enabled, &cli.config).await
        }
        Commands::List { json } => commands::filter::list(json, &cli.config).await,
        Commands::Refresh => commands::filter::refresh(&cli.config).await,
        Commands::Version => {
            println!("filtersync {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
