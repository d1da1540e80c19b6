//! Status command implementation

use anyhow::{Context, Result};

use prolific_agent::config::AgentConfig;
use prolific_agent::privacy::{PseudonymKey, Pseudonymizer};
use prolific_agent::scan::resolve_scan_roots;
use prolific_agent::state::BaselineStore;

pub fn run(config: &AgentConfig) -> Result<()> {
    println!("Repository: {}", config.repo_path.display());
    println!("Branch: {} (remote {}, push {})", config.branch, config.remote, if config.push { "on" } else { "off" });
    println!("Interval: every {}h", config.interval_hours);
    println!("State: {}", config.state_dir.display());

    let store = BaselineStore::open(config.state_path());
    let baseline = store.load().context("Failed to read the baseline")?;
    let key = PseudonymKey::load(&config.key_path()).context("Failed to read the pseudonym key")?;

    println!();
    println!("Projects:");
    let roots = resolve_scan_roots(config);
    match key {
        Some(key) => {
            let pseudonymizer = Pseudonymizer::new(key);
            for root in &roots {
                let identity = pseudonymizer.identify(root.path());
                let known = match baseline.get(&identity) {
                    Some(snapshot) => format!("{} entries, captured {}", snapshot.len(), snapshot.captured_at.format("%Y-%m-%d %H:%M:%SZ")),
                    None => "not yet scanned".to_string(),
                };
                println!("  {identity}  {}  ({known})", root.path().display());
            }
        }
        None => {
            for root in &roots {
                println!("  {}  (no key yet; identities are assigned on the first run)", root.path().display());
            }
        }
    }
    Ok(())
}
