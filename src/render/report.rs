//! Cycle report aggregation.
//!
//! Only project identities, counts and per-language aggregates survive into
//! a report. Relative paths and file names from the snapshots never do.

use crate::diff::{ChangeCounts, Delta};
use crate::domain::ProjectIdentity;
use crate::estimate::{estimate_by_language, Calibration, LanguageStat};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const REPORT_SCHEMA_VERSION: u32 = 2;

/// Per-project section of a cycle report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReport {
    pub project: ProjectIdentity,
    /// First cycle in which the project was observed. Counts, bytes and LOC
    /// are zero for a discovery; only the fact of discovery is reported.
    pub discovered: bool,
    pub counts: ChangeCounts,
    pub total_delta_bytes: i64,
    pub net_loc_estimate: i64,
    pub churn_loc_estimate: i64,
    pub languages: Vec<LanguageStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleTotals {
    pub projects_active: usize,
    pub projects_discovered: usize,
    pub counts: ChangeCounts,
    pub total_delta_bytes: i64,
    pub net_loc_estimate: i64,
    pub churn_loc_estimate: i64,
    pub languages: Vec<LanguageStat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub schema_version: u32,
    pub event_id: String,
    pub generated_at: DateTime<Utc>,
    pub projects: Vec<ProjectReport>,
    pub totals: CycleTotals,
}

impl CycleReport {
    /// Nothing to publish this cycle.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// One entry of the cumulative visualization dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VizEvent {
    pub event_id: String,
    pub project: ProjectIdentity,
    pub discovered: bool,
    pub counts: ChangeCounts,
    pub total_delta_bytes: i64,
    pub net_loc_estimate: i64,
    pub churn_loc_estimate: i64,
    pub languages: Vec<LanguageStat>,
}

impl From<(&str, &ProjectReport)> for VizEvent {
    fn from((event_id, project): (&str, &ProjectReport)) -> Self {
        Self {
            event_id: event_id.to_string(),
            project: project.project.clone(),
            discovered: project.discovered,
            counts: project.counts,
            total_delta_bytes: project.total_delta_bytes,
            net_loc_estimate: project.net_loc_estimate,
            churn_loc_estimate: project.churn_loc_estimate,
            languages: project.languages.clone(),
        }
    }
}

/// Event identifier for a cycle timestamp, e.g. `2026-01-07T19:22:00Z`.
pub fn format_event_id(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Build the report and viz events of one cycle.
///
/// Projects with no activity are left out. A project seen for the first time
/// is listed as discovered with zeroed counts, bytes and LOC.
pub fn aggregate(
    timestamp: DateTime<Utc>,
    deltas: &[(ProjectIdentity, Delta)],
    calibration: &Calibration,
) -> (CycleReport, Vec<VizEvent>) {
    let generated_at = timestamp.trunc_subsecs(0);
    let event_id = format_event_id(generated_at);

    let mut projects: Vec<ProjectReport> = deltas
        .iter()
        .filter_map(|(identity, delta)| project_report(identity, delta, calibration))
        .collect();
    projects.sort_by(|a, b| a.project.cmp(&b.project));

    let totals = totals(&projects);
    let events = projects.iter().map(|p| VizEvent::from((event_id.as_str(), p))).collect();

    let report = CycleReport { schema_version: REPORT_SCHEMA_VERSION, event_id, generated_at, projects, totals };
    (report, events)
}

fn project_report(identity: &ProjectIdentity, delta: &Delta, calibration: &Calibration) -> Option<ProjectReport> {
    if delta.is_discovery() {
        return Some(ProjectReport {
            project: identity.clone(),
            discovered: true,
            counts: ChangeCounts::default(),
            total_delta_bytes: 0,
            net_loc_estimate: 0,
            churn_loc_estimate: 0,
            languages: Vec::new(),
        });
    }
    if !delta.has_activity() {
        return None;
    }

    let languages: Vec<LanguageStat> = estimate_by_language(&delta.byte_delta_by_ext, calibration)
        .into_iter()
        .filter(|stat| stat.delta_bytes != 0)
        .collect();

    Some(ProjectReport {
        project: identity.clone(),
        discovered: false,
        counts: delta.counts,
        total_delta_bytes: delta.total_byte_delta(),
        net_loc_estimate: languages.iter().map(|s| s.estimated_loc_delta).sum(),
        churn_loc_estimate: languages.iter().map(LanguageStat::churn_loc).sum(),
        languages,
    })
}

fn totals(projects: &[ProjectReport]) -> CycleTotals {
    let mut totals = CycleTotals::default();
    let mut by_language: BTreeMap<String, LanguageStat> = BTreeMap::new();

    for project in projects {
        if project.discovered {
            totals.projects_discovered += 1;
            continue;
        }
        totals.projects_active += 1;
        totals.counts.merge(&project.counts);
        totals.total_delta_bytes += project.total_delta_bytes;
        totals.net_loc_estimate += project.net_loc_estimate;
        totals.churn_loc_estimate += project.churn_loc_estimate;

        for stat in &project.languages {
            by_language
                .entry(stat.language.to_lowercase())
                .and_modify(|acc| {
                    acc.delta_bytes += stat.delta_bytes;
                    acc.estimated_loc_delta += stat.estimated_loc_delta;
                })
                .or_insert_with(|| stat.clone());
        }
    }

    totals.languages = by_language.into_values().collect();
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff, Previous};
    use crate::domain::{FileRecord, ProjectSnapshot};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 7, 19, 22, 0).unwrap()
    }

    fn identity(hex: &str) -> ProjectIdentity {
        ProjectIdentity::from_digest_hex(hex)
    }

    fn calibration(pairs: &[(&str, u32)]) -> Calibration {
        Calibration::from_overrides(&pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    fn snapshot(records: Vec<FileRecord>) -> ProjectSnapshot {
        ProjectSnapshot::from_records(ts(), records)
    }

    #[test]
    fn event_id_is_second_resolution_utc() {
        assert_eq!(format_event_id(ts()), "2026-01-07T19:22:00Z");
    }

    #[test]
    fn discovery_contributes_no_bytes_or_loc() {
        let current = snapshot(vec![FileRecord::file("big.py", 1_000_000, 1), FileRecord::dir("src", 1)]);
        let delta = diff(Previous::FirstSight, &current);
        let (report, events) = aggregate(ts(), &[(identity("aaaaaaaaaaaa"), delta)], &Calibration::default());

        assert_eq!(report.projects.len(), 1);
        let project = &report.projects[0];
        assert!(project.discovered);
        assert_eq!(project.total_delta_bytes, 0);
        assert_eq!(project.net_loc_estimate, 0);
        assert_eq!(project.counts, ChangeCounts::default());
        assert_eq!(report.totals.projects_discovered, 1);
        assert_eq!(report.totals.net_loc_estimate, 0);
        assert_eq!(report.totals.total_delta_bytes, 0);
        assert_eq!(events.len(), 1);
        assert!(events[0].discovered);
    }

    #[test]
    fn three_python_files_estimate_thirty_lines() {
        let before = snapshot(vec![FileRecord::file("README.md", 10, 1)]);
        let after = snapshot(vec![
            FileRecord::file("README.md", 10, 1),
            FileRecord::file("a.py", 300, 2),
            FileRecord::file("b.py", 250, 2),
            FileRecord::file("c.py", 350, 2),
        ]);
        let delta = diff(Previous::Known(&before), &after);
        let (report, _) = aggregate(ts(), &[(identity("bbbbbbbbbbbb"), delta)], &calibration(&[("python", 30)]));

        let project = &report.projects[0];
        assert_eq!(project.counts.files_added, 3);
        assert_eq!(project.languages.len(), 1);
        assert_eq!(project.languages[0].language, "Python");
        assert_eq!(project.languages[0].estimated_loc_delta, 30);
        assert_eq!(report.totals.net_loc_estimate, 30);
        assert_eq!(report.totals.churn_loc_estimate, 30);
    }

    #[test]
    fn inactive_projects_are_omitted() {
        let snap = snapshot(vec![FileRecord::file("a.rs", 10, 1)]);
        let delta = diff(Previous::Known(&snap), &snap);
        let (report, events) = aggregate(ts(), &[(identity("cccccccccccc"), delta)], &Calibration::default());
        assert!(report.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn totals_sum_languages_across_projects() {
        let cal = calibration(&[("rust", 20)]);
        let before = snapshot(vec![FileRecord::file("lib.rs", 600, 1)]);
        let shrunk = snapshot(vec![FileRecord::file("lib.rs", 200, 2)]);
        let grown = snapshot(vec![FileRecord::file("lib.rs", 1000, 2)]);

        let deltas = vec![
            (identity("111111111111"), diff(Previous::Known(&before), &shrunk)),
            (identity("222222222222"), diff(Previous::Known(&before), &grown)),
        ];
        let (report, _) = aggregate(ts(), &deltas, &cal);

        assert_eq!(report.projects[0].net_loc_estimate, -20);
        assert_eq!(report.projects[1].net_loc_estimate, 20);
        assert_eq!(report.totals.net_loc_estimate, 0);
        assert_eq!(report.totals.churn_loc_estimate, 40);
        assert_eq!(report.totals.languages.len(), 1);
        assert_eq!(report.totals.languages[0].delta_bytes, 0);
        assert_eq!(report.totals.projects_active, 2);
    }

    #[test]
    fn projects_are_sorted_by_identity() {
        let snap = snapshot(vec![FileRecord::file("x.go", 10, 1)]);
        let deltas = vec![
            (identity("ffffffffffff"), diff(Previous::FirstSight, &snap)),
            (identity("000000000000"), diff(Previous::FirstSight, &snap)),
        ];
        let (report, _) = aggregate(ts(), &deltas, &Calibration::default());
        let ids: Vec<&str> = report.projects.iter().map(|p| p.project.as_str()).collect();
        assert_eq!(ids, vec!["Project-000000000000", "Project-ffffffffffff"]);
    }
}
