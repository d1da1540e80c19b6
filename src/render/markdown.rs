//! Human-readable cycle summary.

use super::report::{CycleReport, ProjectReport};
use crate::diff::ChangeCounts;
use crate::estimate::LanguageStat;
use std::fmt::Write;

const PRIVACY_NOTE: &str =
    "Privacy: generated from file metadata only (sizes, mtimes, extensions). No file contents were read.";

pub fn render_markdown(report: &CycleReport) -> String {
    let mut out = String::new();
    let totals = &report.totals;

    let _ = writeln!(out, "## Prolific activity: {}", report.event_id);
    out.push('\n');
    out.push_str("### Summary\n");
    let _ = writeln!(out, "- Active projects: {}", totals.projects_active);
    if totals.projects_discovered > 0 {
        let _ = writeln!(out, "- New projects detected: {}", totals.projects_discovered);
    }
    let _ = writeln!(out, "- Estimated net LOC: {}", signed(totals.net_loc_estimate));
    let _ = writeln!(out, "- Estimated churn LOC: {}", totals.churn_loc_estimate);
    let _ = writeln!(out, "- Total delta bytes: {}", signed(totals.total_delta_bytes));
    out.push('\n');

    out.push_str("### Counts\n");
    push_counts(&mut out, &totals.counts);
    out.push('\n');

    out.push_str("### Languages\n");
    push_languages(&mut out, &totals.languages);
    out.push('\n');

    out.push_str("### Projects\n");
    for project in &report.projects {
        push_project(&mut out, project);
    }
    out.push('\n');

    out.push_str(PRIVACY_NOTE);
    out.push('\n');
    out
}

fn push_project(out: &mut String, project: &ProjectReport) {
    if project.discovered {
        let _ = writeln!(out, "- {}: new project detected (baseline established)", project.project);
        return;
    }
    let c = &project.counts;
    let _ = writeln!(
        out,
        "- {}: files +{} ~{} -{}, net LOC {}, churn LOC {}",
        project.project,
        c.files_added,
        c.files_modified,
        c.files_removed,
        signed(project.net_loc_estimate),
        project.churn_loc_estimate
    );
}

fn push_counts(out: &mut String, c: &ChangeCounts) {
    let _ = writeln!(out, "- Files: +{} ~{} -{}", c.files_added, c.files_modified, c.files_removed);
    let _ = writeln!(out, "- Folders: +{} ~{} -{}", c.folders_added, c.folders_modified, c.folders_removed);
    let _ = writeln!(out, "- Assets (non-code): +{} ~{} -{}", c.assets_added, c.assets_modified, c.assets_removed);
}

fn push_languages(out: &mut String, languages: &[LanguageStat]) {
    if languages.is_empty() {
        out.push_str("- (none detected)\n");
        return;
    }
    for stat in languages {
        let _ = writeln!(
            out,
            "- {}: delta_bytes={}, estimated_loc_delta={} ({} bytes/LOC)",
            stat.language,
            signed(stat.delta_bytes),
            signed(stat.estimated_loc_delta),
            stat.bytes_per_loc
        );
    }
}

fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff, Previous};
    use crate::domain::{FileRecord, ProjectIdentity, ProjectSnapshot};
    use crate::estimate::Calibration;
    use crate::render::report::aggregate;
    use chrono::{TimeZone, Utc};
    use similar_asserts::assert_eq;

    #[test]
    fn renders_counts_languages_and_privacy_note() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 7, 19, 22, 0).unwrap();
        let before = ProjectSnapshot::from_records(ts, vec![FileRecord::file("main.rs", 600, 1)]);
        let after = ProjectSnapshot::from_records(
            ts,
            vec![FileRecord::file("main.rs", 200, 2), FileRecord::file("logo.png", 10, 2), FileRecord::dir("assets", 2)],
        );
        let overrides = [("rust".to_string(), 20)].into_iter().collect();
        let project = ProjectIdentity::from_digest_hex("0123456789ab");
        let (report, _) =
            aggregate(ts, &[(project, diff(Previous::Known(&before), &after))], &Calibration::from_overrides(&overrides));

        let expected = "\
## Prolific activity: 2026-01-07T19:22:00Z

### Summary
- Active projects: 1
- Estimated net LOC: -20
- Estimated churn LOC: 20
- Total delta bytes: -390

### Counts
- Files: +1 ~1 -0
- Folders: +1 ~0 -0
- Assets (non-code): +1 ~0 -0

### Languages
- Other: delta_bytes=+10, estimated_loc_delta=0 (40 bytes/LOC)
- Rust: delta_bytes=-400, estimated_loc_delta=-20 (20 bytes/LOC)

### Projects
- Project-0123456789ab: files +1 ~1 -0, net LOC -20, churn LOC 20

Privacy: generated from file metadata only (sizes, mtimes, extensions). No file contents were read.
";
        assert_eq!(render_markdown(&report), expected);
    }
}
