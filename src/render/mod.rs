//! Report artifacts published to the activity repository
//!
//! Everything rendered here is built from [`CycleReport`] values only.

pub mod markdown;
pub mod report;
pub mod viz;

pub use markdown::render_markdown;
pub use report::{aggregate, format_event_id, CycleReport, CycleTotals, ProjectReport, VizEvent, REPORT_SCHEMA_VERSION};
pub use viz::{append_viz_events, ensure_site_entrypoints};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REPORTS_DIR: &str = "reports";
pub const README_FILE: &str = "README.md";

const README_TEMPLATE: &str = "\
# Prolific activity

Coding activity published by prolific-agent.

- `reports/<date>/<time>.json` and `.md`: one aggregate report per cycle.
- `viz/`: local preview of the bubblemap (open `viz/index.html`).
- `docs/`: the same bubblemap for GitHub Pages.

Reports contain pseudonymous project identifiers, file counts and estimated
line deltas per language. They are derived from file metadata only: no file
names, paths or contents are published.
";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file to be written into the activity repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the repository root, `/`-separated.
    pub rel_path: String,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(rel_path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self { rel_path: rel_path.into(), contents: contents.into() }
    }
}

fn report_stem(ts: DateTime<Utc>) -> String {
    format!("{REPORTS_DIR}/{}/{}", ts.format("%Y-%m-%d"), ts.format("%H%M%S"))
}

/// `reports/<YYYY-MM-DD>/<HHMMSS>.json` and `.md` for a report.
pub fn report_files(report: &CycleReport) -> Result<Vec<Artifact>, RenderError> {
    let stem = report_stem(report.generated_at);

    let mut json = serde_json::to_vec_pretty(report)?;
    json.push(b'\n');

    Ok(vec![
        Artifact::new(format!("{stem}.json"), json),
        Artifact::new(format!("{stem}.md"), render_markdown(report)),
    ])
}

/// First whole second at or after `ts` with no report in `repo_root` yet.
///
/// Event ids have one-second resolution; a cycle queued behind another in
/// the same second is moved to the next free second instead of overwriting
/// its report and viz events.
pub fn unused_report_time(repo_root: &Path, ts: DateTime<Utc>) -> DateTime<Utc> {
    let mut ts = ts.trunc_subsecs(0);
    while repo_root.join(format!("{}.json", report_stem(ts))).exists() {
        ts += Duration::seconds(1);
    }
    ts
}

/// README for an activity repository that has none yet.
pub fn readme_bootstrap(repo_root: &Path) -> Option<Artifact> {
    if repo_root.join(README_FILE).exists() {
        return None;
    }
    Some(Artifact::new(README_FILE, README_TEMPLATE))
}

/// Every artifact a non-empty cycle publishes.
pub fn cycle_artifacts(repo_root: &Path, report: &CycleReport, events: &[VizEvent]) -> Result<Vec<Artifact>, RenderError> {
    let mut artifacts = Vec::new();
    artifacts.extend(readme_bootstrap(repo_root));
    artifacts.extend(report_files(report)?);
    artifacts.extend(append_viz_events(repo_root, events)?);
    artifacts.extend(ensure_site_entrypoints(repo_root));
    Ok(artifacts)
}
