//! Line-of-code estimation from byte deltas
//!
//! `estimated_loc_delta = byte_delta / bytes_per_loc`, truncated toward zero.
//! The result is reproducible and never has the opposite sign of the byte
//! delta; it makes no claim of matching real line counts.

pub mod languages;

pub use languages::{is_known_extension, language_for_extension, GENERIC_BYTES_PER_LOC, OTHER_LANGUAGE};

use languages::builtin_bytes_per_loc;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a bytes-per-line value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSource {
    Configured,
    BuiltIn,
    /// No entry for the language; [`GENERIC_BYTES_PER_LOC`] applied.
    Fallback,
}

/// Per-language bytes-per-line table: config overrides over built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    overrides: BTreeMap<String, u32>,
}

impl Calibration {
    /// Build from config overrides. Keys are matched case-insensitively;
    /// zero values are ignored.
    pub fn from_overrides(overrides: &BTreeMap<String, u32>) -> Self {
        let overrides = overrides
            .iter()
            .filter(|(_, value)| **value > 0)
            .map(|(language, value)| (language.trim().to_lowercase(), *value))
            .collect();
        Self { overrides }
    }

    pub fn bytes_per_loc(&self, language: &str) -> (u32, CalibrationSource) {
        if let Some(value) = self.overrides.get(&language.to_lowercase()) {
            return (*value, CalibrationSource::Configured);
        }
        match builtin_bytes_per_loc(language) {
            Some(value) => (value, CalibrationSource::BuiltIn),
            None => (GENERIC_BYTES_PER_LOC, CalibrationSource::Fallback),
        }
    }
}

/// Estimate for one language within one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageStat {
    pub language: String,
    pub delta_bytes: i64,
    pub bytes_per_loc: u32,
    pub estimated_loc_delta: i64,
    #[serde(skip)]
    pub calibration: CalibrationSource,
}

impl LanguageStat {
    /// Absolute line estimate, used for churn.
    pub fn churn_loc(&self) -> i64 {
        self.delta_bytes.abs() / i64::from(self.bytes_per_loc)
    }
}

/// Estimate the LOC delta of `byte_delta` bytes of `language`.
pub fn estimate_language(language: &str, byte_delta: i64, calibration: &Calibration) -> LanguageStat {
    let (bytes_per_loc, source) = calibration.bytes_per_loc(language);
    if source == CalibrationSource::Fallback && language != OTHER_LANGUAGE {
        tracing::debug!(language, bytes_per_loc, "No calibration for language; using generic default");
    }
    LanguageStat {
        language: language.to_string(),
        delta_bytes: byte_delta,
        bytes_per_loc,
        // Integer division truncates toward zero.
        estimated_loc_delta: byte_delta / i64::from(bytes_per_loc),
        calibration: source,
    }
}

/// Estimate the LOC delta of `byte_delta` bytes of files with `extension`.
pub fn estimate(extension: &str, byte_delta: i64, calibration: &Calibration) -> LanguageStat {
    estimate_language(language_for_extension(extension), byte_delta, calibration)
}

/// Group per-extension byte deltas by language and estimate each language.
///
/// Results are sorted by language label (case-insensitive).
pub fn estimate_by_language(byte_delta_by_ext: &BTreeMap<String, i64>, calibration: &Calibration) -> Vec<LanguageStat> {
    let mut by_language: BTreeMap<&'static str, i64> = BTreeMap::new();
    for (ext, delta) in byte_delta_by_ext {
        *by_language.entry(language_for_extension(ext)).or_insert(0) += delta;
    }

    let mut stats: Vec<LanguageStat> = by_language
        .into_iter()
        .map(|(language, delta)| estimate_language(language, delta, calibration))
        .collect();
    stats.sort_by_key(|s| s.language.to_lowercase());
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration(pairs: &[(&str, u32)]) -> Calibration {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Calibration::from_overrides(&map)
    }

    #[test]
    fn python_additions_with_configured_calibration() {
        let stat = estimate("py", 900, &calibration(&[("python", 30)]));
        assert_eq!(stat.language, "Python");
        assert_eq!(stat.estimated_loc_delta, 30);
        assert_eq!(stat.calibration, CalibrationSource::Configured);
    }

    #[test]
    fn shrink_yields_negative_estimate() {
        let stat = estimate("rs", 200 - 600, &calibration(&[("Rust", 20)]));
        assert_eq!(stat.estimated_loc_delta, -20);
    }

    #[test]
    fn rounds_toward_zero_and_keeps_sign() {
        let cal = calibration(&[("go", 30)]);
        for delta in [-1000i64, -61, -29, -1, 0, 1, 29, 61, 1000] {
            let est = estimate("go", delta, &cal).estimated_loc_delta;
            assert!(est.signum() == 0 || est.signum() == delta.signum(), "delta {delta} -> {est}");
            assert!(est.abs() * 30 <= delta.abs());
        }
        assert_eq!(estimate("go", 61, &cal).estimated_loc_delta, 2);
        assert_eq!(estimate("go", -61, &cal).estimated_loc_delta, -2);
        assert_eq!(estimate("go", 0, &cal).estimated_loc_delta, 0);
    }

    #[test]
    fn missing_calibration_falls_back_to_generic_default() {
        let stat = estimate("kt", 400, &Calibration::default());
        assert_eq!(stat.language, "Kotlin");
        assert_eq!(stat.bytes_per_loc, GENERIC_BYTES_PER_LOC);
        assert_eq!(stat.calibration, CalibrationSource::Fallback);
        assert_eq!(stat.estimated_loc_delta, 10);
    }

    #[test]
    fn unknown_extensions_land_in_other_bucket() {
        let stat = estimate("png", 4000, &Calibration::default());
        assert_eq!(stat.language, OTHER_LANGUAGE);
        assert_eq!(stat.estimated_loc_delta, 100);
    }

    #[test]
    fn builtin_defaults_apply_without_overrides() {
        let stat = estimate("py", 340, &Calibration::default());
        assert_eq!(stat.bytes_per_loc, 34);
        assert_eq!(stat.calibration, CalibrationSource::BuiltIn);
        assert_eq!(stat.estimated_loc_delta, 10);
    }

    #[test]
    fn groups_extensions_by_language() {
        let mut deltas = BTreeMap::new();
        deltas.insert("ts".to_string(), 50);
        deltas.insert("tsx".to_string(), 26);
        deltas.insert("py".to_string(), -68);
        let stats = estimate_by_language(&deltas, &Calibration::default());

        let langs: Vec<&str> = stats.iter().map(|s| s.language.as_str()).collect();
        assert_eq!(langs, vec!["Python", "TypeScript"]);
        assert_eq!(stats[0].estimated_loc_delta, -2);
        assert_eq!(stats[0].churn_loc(), 2);
        assert_eq!(stats[1].delta_bytes, 76);
        assert_eq!(stats[1].estimated_loc_delta, 2);
    }
}
