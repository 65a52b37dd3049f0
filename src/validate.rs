//! `errorbook validate`: registry / index / shard consistency check.

use anyhow::{Context, Result};

use errorbook_index_core::models::{Index, Registry};
use errorbook_index_core::validate::{validate, ValidationMode, ValidationSummary};

use crate::config::Config;
use crate::shard_dir::ShardDir;
use crate::storage::read_json;

pub const VALIDATION_PASSED: &str = "registry validation passed";

pub fn run_validate(config: &Config, mode: ValidationMode) -> Result<ValidationSummary> {
    let registry: Registry = read_json(&config.paths.registry_path())?;
    let index: Index = read_json(&config.paths.index_path())?;
    let shards = ShardDir::new(config.paths.shards_path());

    let summary = validate(&registry, &index, &shards, mode)
        .with_context(|| format!("{} is inconsistent", config.paths.index_path().display()))?;

    tracing::info!(
        entries = summary.entries,
        buckets = summary.buckets,
        tokens = summary.tokens,
        shards_checked = summary.shards_checked,
        ?mode,
        "validation passed"
    );
    Ok(summary)
}
