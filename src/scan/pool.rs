//! Bounded concurrent scanning of several roots.

use super::{MetadataScanner, ScanError, ScanOutcome, ScanSettings};
use crate::domain::ScanRoot;
use rayon::prelude::*;

/// Result of scanning one root.
#[derive(Debug)]
pub struct RootScan {
    pub root: ScanRoot,
    pub result: Result<ScanOutcome, ScanError>,
}

fn scan_one(root: &ScanRoot, settings: &ScanSettings) -> RootScan {
    let result = MetadataScanner::new(root.path.clone())
        .exclude_globs(root.exclude_globs.clone())
        .max_depth(settings.max_depth)
        .timeout(settings.timeout)
        .max_entries(settings.max_entries)
        .scan();
    RootScan { root: root.clone(), result }
}

/// Scan `roots` on a small dedicated pool of `workers` threads.
///
/// Results come back in the order of `roots`. Each root carries its own
/// timeout, so one pathological tree cannot hold up the others past it.
pub fn scan_roots(roots: &[ScanRoot], settings: &ScanSettings, workers: usize) -> Vec<RootScan> {
    let threads = workers.clamp(1, roots.len().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("prolific-scan-{idx}"))
        .build();

    match pool {
        Ok(pool) => pool.install(|| roots.par_iter().map(|root| scan_one(root, settings)).collect()),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to start scan pool; scanning sequentially");
            roots.iter().map(|root| scan_one(root, settings)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn one_failing_root_does_not_affect_others() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good");
        fs::create_dir(&good).unwrap();
        fs::write(good.join("a.rs"), "fn a() {}").unwrap();
        let missing = tmp.path().join("missing");

        let roots = vec![ScanRoot::new(&missing, Vec::new()), ScanRoot::new(&good, Vec::new())];
        let settings = ScanSettings { max_depth: None, timeout: Duration::from_secs(30), max_entries: 1000 };
        let results = scan_roots(&roots, &settings, 4);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].root.path, missing);
        assert!(results[0].result.is_err());
        let outcome = results[1].result.as_ref().expect("good root scans");
        assert!(outcome.snapshot.entries.contains_key("a.rs"));
    }
}
