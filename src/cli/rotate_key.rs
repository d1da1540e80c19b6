//! Rotate-key command implementation

use anyhow::{bail, Context, Result};
use clap::Args;

use prolific_agent::config::AgentConfig;
use prolific_agent::privacy::PseudonymKey;
use prolific_agent::state::ProcessLock;

#[derive(Args)]
pub struct RotateKeyArgs {
    /// Confirm that every project identity will change
    #[arg(long)]
    pub yes: bool,
}

pub fn run(config: &AgentConfig, args: RotateKeyArgs) -> Result<()> {
    if !args.yes {
        bail!(
            "Rotating the key gives every project a new identity; published history will no longer \
             link to new activity. Re-run with --yes to proceed."
        );
    }

    let _lock = ProcessLock::acquire(&config.state_dir).context("Failed to lock the state directory")?;
    PseudonymKey::rotate(&config.key_path()).context("Failed to rotate the pseudonym key")?;
    println!("Pseudonym key rotated: {}", config.key_path().display());
    println!("All projects will appear as new projects on the next run.");
    Ok(())
}
