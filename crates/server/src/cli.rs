//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// searchwatch: polls search policies and notifies on threshold violations.
#[derive(Parser, Debug)]
#[command(name = "searchwatch", version, about)]
pub struct Cli {
    /// Config file to load.
    #[arg(short = 'f', long, env = "SEARCHWATCH_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Override the status endpoint listen address from the config file.
    #[arg(long, env = "SEARCHWATCH_LISTEN")]
    pub listen: Option<String>,
}
