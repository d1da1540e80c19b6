//! Cumulative visualization dataset and static site entrypoints.

use super::report::VizEvent;
use super::{Artifact, RenderError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Local preview directory.
pub const VIZ_DIR: &str = "viz";
/// Directory served by GitHub Pages.
pub const PAGES_DIR: &str = "docs";
pub const EVENTS_FILE: &str = "events.json";
pub const INDEX_FILE: &str = "index.html";

const SITE_INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Merge `events` into the existing dataset and return the updated
/// `events.json` for both site directories.
///
/// Events are keyed by `(event_id, project)`; re-appending an event replaces
/// it. The output is sorted by that key.
pub fn append_viz_events(repo_root: &Path, events: &[VizEvent]) -> Result<Vec<Artifact>, RenderError> {
    let mut merged: BTreeMap<(String, String), Value> = BTreeMap::new();
    for existing in load_events(repo_root)? {
        merged.insert(event_key(&existing), existing);
    }
    for event in events {
        let value = serde_json::to_value(event)?;
        merged.insert(event_key(&value), value);
    }

    let dataset: Vec<Value> = merged.into_values().collect();
    let mut bytes = serde_json::to_vec_pretty(&dataset)?;
    bytes.push(b'\n');

    Ok(vec![
        Artifact::new(format!("{VIZ_DIR}/{EVENTS_FILE}"), bytes.clone()),
        Artifact::new(format!("{PAGES_DIR}/{EVENTS_FILE}"), bytes),
    ])
}

/// `index.html` for each site directory that does not have one yet.
pub fn ensure_site_entrypoints(repo_root: &Path) -> Vec<Artifact> {
    [VIZ_DIR, PAGES_DIR]
        .iter()
        .map(|dir| format!("{dir}/{INDEX_FILE}"))
        .filter(|rel| !repo_root.join(rel).exists())
        .map(|rel| Artifact::new(rel, SITE_INDEX_HTML.as_bytes().to_vec()))
        .collect()
}

fn event_key(event: &Value) -> (String, String) {
    let field = |name: &str| event.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    (field("event_id"), field("project"))
}

fn load_events(repo_root: &Path) -> Result<Vec<Value>, RenderError> {
    let primary = repo_root.join(VIZ_DIR).join(EVENTS_FILE);
    let path = if primary.exists() { primary } else { repo_root.join(PAGES_DIR).join(EVENTS_FILE) };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(RenderError::Read { path, source }),
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(events)) => Ok(events),
        Ok(_) | Err(_) => {
            tracing::warn!(path = %path.display(), "Visualization dataset is malformed; starting a new one");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeCounts;
    use crate::domain::ProjectIdentity;
    use std::fs;
    use tempfile::TempDir;

    fn event(event_id: &str, hex: &str, net: i64) -> VizEvent {
        VizEvent {
            event_id: event_id.to_string(),
            project: ProjectIdentity::from_digest_hex(hex),
            discovered: false,
            counts: ChangeCounts::default(),
            total_delta_bytes: 0,
            net_loc_estimate: net,
            churn_loc_estimate: 0,
            languages: Vec::new(),
        }
    }

    fn parse(artifact: &Artifact) -> Vec<Value> {
        serde_json::from_slice(&artifact.contents).unwrap()
    }

    #[test]
    fn writes_identical_dataset_to_both_site_dirs() {
        let tmp = TempDir::new().unwrap();
        let artifacts = append_viz_events(tmp.path(), &[event("2026-01-01T00:00:00Z", "aaaaaaaaaaaa", 1)]).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].rel_path, "viz/events.json");
        assert_eq!(artifacts[1].rel_path, "docs/events.json");
        assert_eq!(artifacts[0].contents, artifacts[1].contents);
        assert_eq!(parse(&artifacts[0]).len(), 1);
    }

    #[test]
    fn appends_dedupes_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let first = append_viz_events(
            tmp.path(),
            &[event("2026-01-02T00:00:00Z", "bbbbbbbbbbbb", 1), event("2026-01-01T00:00:00Z", "aaaaaaaaaaaa", 1)],
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join(VIZ_DIR)).unwrap();
        fs::write(tmp.path().join("viz/events.json"), &first[0].contents).unwrap();

        let second = append_viz_events(
            tmp.path(),
            &[event("2026-01-02T00:00:00Z", "bbbbbbbbbbbb", 5), event("2026-01-03T00:00:00Z", "aaaaaaaaaaaa", 2)],
        )
        .unwrap();
        let events = parse(&second[0]);
        let ids: Vec<&str> = events.iter().map(|e| e["event_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["2026-01-01T00:00:00Z", "2026-01-02T00:00:00Z", "2026-01-03T00:00:00Z"]);
        assert_eq!(events[1]["net_loc_estimate"], 5);
    }

    #[test]
    fn malformed_dataset_is_replaced() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(VIZ_DIR)).unwrap();
        fs::write(tmp.path().join("viz/events.json"), "{ not json").unwrap();

        let artifacts = append_viz_events(tmp.path(), &[event("2026-01-01T00:00:00Z", "aaaaaaaaaaaa", 1)]).unwrap();
        assert_eq!(parse(&artifacts[0]).len(), 1);
    }

    #[test]
    fn site_entrypoints_only_when_missing() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(ensure_site_entrypoints(tmp.path()).len(), 2);

        fs::create_dir_all(tmp.path().join(PAGES_DIR)).unwrap();
        fs::write(tmp.path().join("docs/index.html"), "custom").unwrap();
        let missing = ensure_site_entrypoints(tmp.path());
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].rel_path, "viz/index.html");
    }
}
