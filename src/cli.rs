//! CLI argument parsing with clap.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "filtersync")]
#[command(author, version, about = "Keeps URL-backed rule lists fresh on disk")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh filters in the background until interrupted
    Run,

    /// Subscribe to a filter list (downloads it immediately)
    Add {
        /// Display name
        #[arg(long)]
        name: String,
        /// Source URL
        #[arg(long)]
        url: String,
    },

    /// Unsubscribe from a filter list and delete its file
    Remove {
        /// Source URL of the filter
        url: String,
    },

    /// Change a filter's name, URL or enabled state
    #[command(group(ArgGroup::new("state").args(["enable", "disable"])))]
    Modify {
        /// Current source URL of the filter
        url: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New source URL
        #[arg(long)]
        new_url: Option<String>,
        /// Enable the filter
        #[arg(long)]
        enable: bool,
        /// Disable the filter
        #[arg(long)]
        disable: bool,
    },

    /// List subscribed filters
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Download every enabled filter now and swap the results in
    Refresh,

    /// Show version
    Version,
}
