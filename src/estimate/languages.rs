//! Extension to language lookup and built-in calibration.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Bucket for extensions with no known language (assets, docs, data).
pub const OTHER_LANGUAGE: &str = "Other";

/// Bytes per line used when a language has neither a configured nor a
/// built-in calibration.
pub const GENERIC_BYTES_PER_LOC: u32 = 40;

const EXTENSIONS: &[(&str, &str)] = &[
    ("py", "Python"),
    ("pyi", "Python"),
    ("js", "JavaScript"),
    ("cjs", "JavaScript"),
    ("mjs", "JavaScript"),
    ("jsx", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("mts", "TypeScript"),
    ("html", "HTML"),
    ("htm", "HTML"),
    ("css", "CSS"),
    ("scss", "CSS"),
    ("sass", "CSS"),
    ("less", "CSS"),
    ("go", "Go"),
    ("rs", "Rust"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("kts", "Kotlin"),
    ("swift", "Swift"),
    ("cs", "C#"),
    ("c", "C"),
    ("h", "C"),
    ("cc", "C++"),
    ("cpp", "C++"),
    ("cxx", "C++"),
    ("hpp", "C++"),
    ("hxx", "C++"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("sql", "SQL"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("zsh", "Shell"),
    ("ps1", "Shell"),
];

/// Built-in bytes-per-line defaults. Slightly optimistic (lower values give
/// higher estimates); users calibrate per language in the config.
const DEFAULT_BYTES_PER_LOC: &[(&str, u32)] = &[
    ("Python", 34),
    ("TypeScript", 38),
    ("JavaScript", 38),
    ("Go", 38),
    ("Rust", 38),
    ("Java", 46),
    ("C#", 46),
    ("C", 38),
    ("C++", 42),
    ("HTML", 50),
    ("CSS", 50),
    ("SQL", 38),
    ("Shell", 30),
];

static LANGUAGE_BY_EXT: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| EXTENSIONS.iter().copied().collect());

static DEFAULTS_BY_KEY: Lazy<HashMap<String, u32>> =
    Lazy::new(|| DEFAULT_BYTES_PER_LOC.iter().map(|(lang, bpl)| (lang.to_lowercase(), *bpl)).collect());

/// Language label for a lower-cased extension; [`OTHER_LANGUAGE`] when unknown.
pub fn language_for_extension(ext: &str) -> &'static str {
    LANGUAGE_BY_EXT.get(ext.to_ascii_lowercase().as_str()).copied().unwrap_or(OTHER_LANGUAGE)
}

pub fn is_known_extension(ext: &str) -> bool {
    !ext.is_empty() && LANGUAGE_BY_EXT.contains_key(ext.to_ascii_lowercase().as_str())
}

pub(crate) fn builtin_bytes_per_loc(language: &str) -> Option<u32> {
    DEFAULTS_BY_KEY.get(&language.to_lowercase()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions_case_insensitively() {
        assert_eq!(language_for_extension("py"), "Python");
        assert_eq!(language_for_extension("TSX"), "TypeScript");
        assert_eq!(language_for_extension("hpp"), "C++");
    }

    #[test]
    fn unknown_and_empty_extensions_are_other() {
        assert_eq!(language_for_extension("png"), OTHER_LANGUAGE);
        assert_eq!(language_for_extension(""), OTHER_LANGUAGE);
        assert!(!is_known_extension(""));
        assert!(!is_known_extension("png"));
        assert!(is_known_extension("RS"));
    }

    #[test]
    fn builtin_calibration_lookup_ignores_case() {
        assert_eq!(builtin_bytes_per_loc("python"), Some(34));
        assert_eq!(builtin_bytes_per_loc("C#"), Some(46));
        assert_eq!(builtin_bytes_per_loc("Kotlin"), None);
    }
}
