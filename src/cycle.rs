//! One scan, diff, estimate, publish cycle
//!
//! [`run_cycle`] is the single entrypoint used by the CLI and by whatever
//! scheduler triggers the agent. It keeps no state between calls: everything
//! that survives a cycle lives in the baseline file and the activity repo.

use crate::config::{AgentConfig, ConfigError};
use crate::diff::{diff, Delta, Previous};
use crate::domain::ProjectIdentity;
use crate::estimate::{Calibration, CalibrationSource, OTHER_LANGUAGE};
use crate::privacy::{KeyError, PseudonymKey, Pseudonymizer};
use crate::publish::{commit_message, GitPublisher, PublishError, PublishOutcome, PushStatus};
use crate::render::{aggregate, cycle_artifacts, unused_report_time, CycleReport, RenderError};
use crate::scan::{resolve_scan_roots, scan_roots, ScanSettings};
use crate::state::{Baseline, BaselineStore, ProcessLock, StoreError};
use crate::utils::is_filesystem_root;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Fatal cycle errors. Nothing is committed and the baseline is not saved.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    CommittedAndPushed,
    /// Committed locally; push disabled or failed.
    CommittedOnly,
    NoChanges,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::CommittedAndPushed => write!(f, "committed and pushed"),
            CycleOutcome::CommittedOnly => write!(f, "committed only"),
            CycleOutcome::NoChanges => write!(f, "no changes"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

/// A non-fatal cycle event. Local only; never published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub project: Option<ProjectIdentity>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        match &self.project {
            Some(project) => write!(f, "{level}: [{project}] {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

#[derive(Debug, Default)]
struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    fn info(&mut self, project: Option<&ProjectIdentity>, message: impl Into<String>) {
        self.push(Severity::Info, project, message.into());
    }

    fn warn(&mut self, project: Option<&ProjectIdentity>, message: impl Into<String>) {
        let message = message.into();
        match project {
            Some(project) => tracing::warn!(project = %project, "{message}"),
            None => tracing::warn!("{message}"),
        }
        self.push(Severity::Warning, project, message);
    }

    fn push(&mut self, severity: Severity, project: Option<&ProjectIdentity>, message: String) {
        self.0.push(Diagnostic { severity, project: project.cloned(), message });
    }
}

/// Inputs of a cycle besides the configuration.
pub struct CycleContext {
    pseudonymizer: Pseudonymizer,
    now: Option<DateTime<Utc>>,
}

impl CycleContext {
    pub fn new(key: PseudonymKey) -> Self {
        Self { pseudonymizer: Pseudonymizer::new(key), now: None }
    }

    /// Load (or create on first run) the pseudonym key from the state dir.
    pub fn load(config: &AgentConfig) -> Result<Self, CycleError> {
        Ok(Self::new(PseudonymKey::load_or_create(&config.key_path())?))
    }

    /// Fix the cycle timestamp instead of reading the clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn pseudonymizer(&self) -> &Pseudonymizer {
        &self.pseudonymizer
    }
}

#[derive(Debug)]
pub struct CycleResult {
    pub outcome: CycleOutcome,
    /// The published report, `None` when nothing was reported.
    pub report: Option<CycleReport>,
    pub commit: Option<String>,
    pub push: PushStatus,
    /// Repository-relative paths written this cycle.
    pub artifacts: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CycleResult {
    pub fn event_id(&self) -> Option<&str> {
        self.report.as_ref().map(|r| r.event_id.as_str())
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Warning)
    }
}

/// Run one complete cycle.
///
/// Blocks while another cycle holds the state directory lock. Per-root scan
/// failures and push failures are diagnostics; repository, key and baseline
/// failures abort the cycle without saving the baseline.
pub fn run_cycle(config: &AgentConfig, ctx: &CycleContext) -> Result<CycleResult, CycleError> {
    let result = try_run_cycle(config, ctx);
    if let Err(err) = &result {
        tracing::error!(error = %err, "Cycle failed");
    }
    result
}

fn try_run_cycle(config: &AgentConfig, ctx: &CycleContext) -> Result<CycleResult, CycleError> {
    config.validate()?;
    let _lock = ProcessLock::acquire(&config.state_dir)?;
    let mut diagnostics = Diagnostics::default();

    let publisher = GitPublisher::open(&config.repo_path, &config.branch, &config.remote)?;
    publisher.validate()?;
    publisher.prepare()?;
    let now = unused_report_time(publisher.workdir(), ctx.now.unwrap_or_else(Utc::now));

    let roots = resolve_scan_roots(config);
    let assigned = ctx.pseudonymizer.assign(&roots)?;
    for (root, identity) in &assigned {
        if is_filesystem_root(root.path()) {
            diagnostics.warn(
                Some(identity),
                "scan root is a filesystem root; point the agent at a project folder instead",
            );
        }
    }

    let store = BaselineStore::open(config.state_path());
    let mut baseline = store.load()?;
    tracing::info!(roots = assigned.len(), known = baseline.len(), "Starting cycle");

    let scan_list: Vec<_> = assigned.iter().map(|(root, _)| root.clone()).collect();
    let scans = scan_roots(&scan_list, &ScanSettings::from_config(config), config.scan_workers);

    let mut next_baseline = Baseline::new();
    let mut deltas: Vec<(ProjectIdentity, Delta)> = Vec::new();
    for ((_, identity), scan) in assigned.iter().zip(scans) {
        match scan.result {
            Ok(outcome) => {
                if outcome.stats.errors_skipped > 0 {
                    diagnostics.warn(
                        Some(identity),
                        format!("{} unreadable entries skipped", outcome.stats.errors_skipped),
                    );
                }
                let previous = baseline.get(identity);
                let delta = diff(Previous::from(previous), &outcome.snapshot);
                if delta.is_discovery() {
                    diagnostics.info(Some(identity), "new project detected; baseline established");
                }
                tracing::debug!(
                    project = %identity,
                    added = delta.added.len(),
                    removed = delta.removed.len(),
                    modified = delta.modified.len(),
                    "Diffed project"
                );
                deltas.push((identity.clone(), delta));
                next_baseline.insert(identity.clone(), outcome.snapshot);
            }
            Err(err) => {
                let kind = if err.is_incomplete() { "scan incomplete" } else { "scan failed" };
                diagnostics.warn(Some(identity), format!("{kind}: {err}"));
                if let Some(previous) = baseline.remove(identity) {
                    next_baseline.insert(identity.clone(), previous);
                }
            }
        }
    }

    let calibration = Calibration::from_overrides(&config.bytes_per_loc);
    let (report, events) = aggregate(now, &deltas, &calibration);
    for stat in report.totals.languages.iter().filter(|s| s.calibration == CalibrationSource::Fallback) {
        if stat.language != OTHER_LANGUAGE {
            diagnostics.info(None, format!("no calibration for {}; using {} bytes/LOC", stat.language, stat.bytes_per_loc));
        }
    }

    let (published, commit, artifacts) = if report.is_empty() {
        tracing::info!("No activity this cycle");
        (None, None, Vec::new())
    } else {
        let artifacts = cycle_artifacts(publisher.workdir(), &report, &events)?;
        let paths: Vec<String> = artifacts.iter().map(|a| a.rel_path.clone()).collect();
        let commit = match publisher.publish(&artifacts, &commit_message(&report.event_id))? {
            PublishOutcome::Committed { commit } => Some(commit),
            PublishOutcome::Unchanged => None,
        };
        (Some(report), commit, paths)
    };

    let push = if config.push { publisher.push_pending() } else { PushStatus::Disabled };
    if let PushStatus::Failed { reason } = &push {
        diagnostics.warn(None, format!("push failed, will retry next cycle: {reason}"));
    }

    store.save(&next_baseline)?;

    let outcome = match (&commit, push.is_failed() || push == PushStatus::Disabled) {
        (Some(_), false) => CycleOutcome::CommittedAndPushed,
        (Some(_), true) => CycleOutcome::CommittedOnly,
        (None, _) => CycleOutcome::NoChanges,
    };
    tracing::info!(outcome = %outcome, "Cycle finished");

    Ok(CycleResult { outcome, report: published, commit, push, artifacts, diagnostics: diagnostics.0 })
}
