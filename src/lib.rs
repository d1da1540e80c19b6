//! prolific-agent: infer coding activity from file metadata
//!
//! Each cycle scans the configured project folders (metadata only), diffs
//! them against the previous cycle, estimates line-of-code deltas from byte
//! deltas, replaces project paths with keyed pseudonyms and commits the
//! aggregate report to a git repository the user controls.

pub mod config;
pub mod cycle;
pub mod diff;
pub mod domain;
pub mod estimate;
pub mod logging;
pub mod privacy;
pub mod publish;
pub mod render;
pub mod scan;
pub mod state;
pub mod utils;

pub use config::{load_config, AgentConfig, ConfigError};
pub use cycle::{run_cycle, CycleContext, CycleError, CycleOutcome, CycleResult, Diagnostic, Severity};
