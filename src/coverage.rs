//! `errorbook coverage`: the index coverage gate.
//!
//! Reads the registry and the index as they are on disk and reports how
//! many entries are reachable through a mapped bucket. The caller prints
//! the report and turns a failed gate into exit status
//! [`GATE_FAILED_EXIT_CODE`], distinct from the status of a crash.

use anyhow::Result;

use errorbook_index_core::coverage::{compute_coverage, parse_percent, resolve_threshold, CoverageReport};
use errorbook_index_core::models::{Index, Registry};

use crate::config::Config;
use crate::storage::read_json;

/// Environment override for the gate threshold.
pub const MIN_COVERAGE_ENV: &str = "ERRORBOOK_INDEX_MIN_COVERAGE";
/// Exit status of a gate that ran and failed.
pub const GATE_FAILED_EXIT_CODE: i32 = 2;
/// Exit status of every other failure, usage errors included.
pub const ERROR_EXIT_CODE: i32 = 1;

/// `min_coverage` is the raw `--min-coverage` text; an unparsable value
/// falls through to the environment, the config and the default.
pub fn run_coverage(config: &Config, min_coverage: Option<&str>) -> Result<CoverageReport> {
    if let Some(raw) = min_coverage.filter(|raw| parse_percent(raw).is_none()) {
        tracing::warn!(value = raw, "ignoring unparsable --min-coverage");
    }
    let env_override = std::env::var(MIN_COVERAGE_ENV).ok();
    let threshold = resolve_threshold(
        min_coverage,
        env_override.as_deref(),
        config.coverage.min_coverage,
    );

    let registry: Registry = read_json(&config.paths.registry_path())?;
    let index: Index = read_json(&config.paths.index_path())?;

    let report = compute_coverage(&registry, &index, threshold);
    if report.passed {
        tracing::info!(
            coverage = report.coverage_percent,
            threshold,
            "coverage gate passed"
        );
    } else {
        tracing::warn!(
            coverage = report.coverage_percent,
            threshold,
            uncovered = report.uncovered_entries,
            "coverage gate failed"
        );
    }
    Ok(report)
}
