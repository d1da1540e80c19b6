//! Command-line interface for prolific-agent
//!
//! `run` executes one cycle and exits; scheduling is left to the OS
//! (systemd timer, Scheduled Task) or the user.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use prolific_agent::config::{default_config_path, load_config, AgentConfig};
use prolific_agent::logging::{self, LoggingGuard};

mod rotate_key;
mod run;
mod status;

/// Infer coding activity from file metadata and publish anonymized reports
#[derive(Parser)]
#[command(name = "prolific-agent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.prolific/config.toml)
    #[arg(short, long, global = true, value_name = "PATH", env = "PROLIFIC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scan and publish cycle
    Run,

    /// Show configuration, project identities and baseline state
    Status,

    /// Replace the pseudonym key (every project gets a new identity)
    RotateKey(rotate_key::RotateKeyArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => default_config_path().context("Could not determine the home directory; pass --config")?,
    };

    // The log file lives in the state dir, so it is only known once the
    // config loaded; a broken config is still reported on stderr.
    let loaded = load_config(&config_path);
    let _guard: LoggingGuard = logging::init(cli.verbose, loaded.as_ref().ok().map(|c| c.log_dir()).as_deref());
    let config: AgentConfig =
        loaded.with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    match cli.command {
        Commands::Run => run::run(&config),
        Commands::Status => status::run(&config),
        Commands::RotateKey(args) => rotate_key::run(&config, args),
    }
}
