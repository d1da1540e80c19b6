//! Run command implementation

use anyhow::{Context, Result};

use prolific_agent::config::AgentConfig;
use prolific_agent::cycle::{run_cycle, CycleContext};
use prolific_agent::publish::PushStatus;

pub fn run(config: &AgentConfig) -> Result<()> {
    let ctx = CycleContext::load(config).context("Failed to load the pseudonym key")?;
    let result = run_cycle(config, &ctx).context("Cycle failed")?;

    println!("Outcome: {}", result.outcome);
    if let Some(report) = &result.report {
        let totals = &report.totals;
        println!("Event: {}", report.event_id);
        println!(
            "Projects: {} active, {} new",
            totals.projects_active, totals.projects_discovered
        );
        println!("Estimated net LOC: {}", totals.net_loc_estimate);
        println!("Estimated churn LOC: {}", totals.churn_loc_estimate);
    }
    if let Some(commit) = &result.commit {
        println!("Commit: {commit}");
    }
    match &result.push {
        PushStatus::Disabled => println!("Push: disabled"),
        PushStatus::UpToDate => println!("Push: up to date"),
        PushStatus::Pushed { commits } => println!("Push: {commits} commit(s) pushed"),
        PushStatus::Failed { reason } => println!("Push: failed ({reason}); will retry next run"),
    }
    for diagnostic in &result.diagnostics {
        eprintln!("{diagnostic}");
    }
    Ok(())
}
