//! Coverage gate.
//!
//! Recomputes every entry's tokens with the index's own minimum length and
//! checks that at least one token leads, through `token_to_bucket`, to a
//! bucket that has a shard location. Failures are collected per entry and
//! never abort the computation; only the aggregate decides the gate.

use serde::{Serialize, Serializer};

use crate::models::{Entry, Index, Registry};
use crate::tokenize::tokenize;

/// Threshold used when neither the caller nor the environment sets one.
pub const DEFAULT_MIN_COVERAGE: f64 = 85.0;
/// Maximum number of uncovered entries listed in a report.
pub const UNCOVERED_SAMPLE_LIMIT: usize = 20;
/// Value of the report's `mode` field.
pub const COVERAGE_MODE: &str = "index-coverage-gate";

/// Why an entry is not reachable through the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncoveredReason {
    NoIndexableTokens,
    TokenNotMappedToExistingBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncoveredEntry {
    pub id: String,
    pub reason: UncoveredReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub mode: &'static str,
    #[serde(serialize_with = "serialize_percent")]
    pub threshold_percent: f64,
    pub total_entries: usize,
    pub covered_entries: usize,
    pub uncovered_entries: usize,
    #[serde(serialize_with = "serialize_percent")]
    pub coverage_percent: f64,
    pub passed: bool,
    pub uncovered_sample: Vec<UncoveredEntry>,
}

/// Whole percentages are written as integers (`85`, not `85.0`).
fn serialize_percent<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Parse a percentage given as text; `None` unless it is a finite number.
pub fn parse_percent(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Pick the gate threshold: explicit value, then environment override,
/// then configured value, then [`DEFAULT_MIN_COVERAGE`]. Values that are
/// not finite numbers are skipped.
pub fn resolve_threshold(
    explicit: Option<&str>,
    env_override: Option<&str>,
    configured: Option<f64>,
) -> f64 {
    let explicit = explicit.and_then(parse_percent);
    let from_env = env_override.and_then(parse_percent);
    [explicit, from_env, configured]
        .into_iter()
        .flatten()
        .find(|value| value.is_finite())
        .unwrap_or(DEFAULT_MIN_COVERAGE)
}

/// `covered / total * 100` rounded to two decimals; 100 for an empty
/// registry.
pub fn coverage_percent(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let percent = covered as f64 / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Check one entry against the index.
pub fn check_entry(entry: &Entry, index: &Index, min_token_length: usize) -> Result<(), UncoveredReason> {
    let tokens = tokenize(entry, min_token_length);
    if tokens.is_empty() {
        return Err(UncoveredReason::NoIndexableTokens);
    }

    let reachable = tokens.iter().any(|token| {
        index
            .token_to_bucket
            .get(token)
            .map(|bucket| bucket.trim())
            .is_some_and(|bucket| !bucket.is_empty() && index.buckets.contains_key(bucket))
    });

    if reachable {
        Ok(())
    } else {
        Err(UncoveredReason::TokenNotMappedToExistingBucket)
    }
}

/// Run the gate over every registry entry.
pub fn compute_coverage(registry: &Registry, index: &Index, threshold: f64) -> CoverageReport {
    let min_token_length = index.effective_min_token_length();

    let mut covered = 0usize;
    let mut uncovered = Vec::new();
    for entry in &registry.entries {
        match check_entry(entry, index, min_token_length) {
            Ok(()) => covered += 1,
            Err(reason) => uncovered.push(UncoveredEntry {
                id: entry.display_id().to_string(),
                reason,
            }),
        }
    }

    let total = registry.entries.len();
    let percent = coverage_percent(covered, total);
    let uncovered_count = uncovered.len();
    uncovered.truncate(UNCOVERED_SAMPLE_LIMIT);

    CoverageReport {
        mode: COVERAGE_MODE,
        threshold_percent: threshold,
        total_entries: total,
        covered_entries: covered,
        uncovered_entries: uncovered_count,
        coverage_percent: percent,
        passed: percent >= threshold,
        uncovered_sample: uncovered,
    }
}
