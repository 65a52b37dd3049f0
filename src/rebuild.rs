//! `errorbook rebuild`: regenerate the index and its shards.
//!
//! Both modes compute the full rebuild in memory. Check mode stops there
//! and reports counts. Write mode then writes every shard, prunes shard
//! files the new index does not reference, and finally rewrites the
//! registry (refreshed count and timestamp) and the index.

use anyhow::Result;
use serde::Serialize;

use errorbook_index_core::build::{build_index, BuildMode, BuildOptions, BuildSummary};
use errorbook_index_core::models::Registry;

use crate::config::Config;
use crate::raw_base::resolve_raw_base;
use crate::shard_dir::ShardDir;
use crate::storage::{read_json, timestamp_now, write_json};

pub const REBUILD_MODE: &str = "rebuild-index";

/// Printed after every rebuild.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildReport {
    pub mode: &'static str,
    pub write: bool,
    #[serde(flatten)]
    pub summary: BuildSummary,
}

pub fn run_rebuild(
    config: &Config,
    mode: BuildMode,
    min_token_length: Option<usize>,
) -> Result<RebuildReport> {
    let min_token_length = min_token_length.unwrap_or(config.index.min_token_length);
    if min_token_length == 0 {
        anyhow::bail!("--min-token-length must be >= 1");
    }

    let registry_path = config.paths.registry_path();
    let index_path = config.paths.index_path();
    let shards = ShardDir::new(config.paths.shards_path());

    let mut registry: Registry = read_json(&registry_path)?;
    let classifier = config.classifier()?;
    let raw_base = resolve_raw_base(config);
    let generated_at = timestamp_now();

    tracing::info!(
        registry = %registry_path.display(),
        entries = registry.entries.len(),
        min_token_length,
        raw_base = %raw_base,
        "rebuilding index"
    );

    let (summary, index) = {
        let build = build_index(
            &registry,
            &classifier,
            &BuildOptions {
                min_token_length,
                raw_base: &raw_base,
                generated_at: &generated_at,
            },
        );
        let summary = build.summary();

        if !mode.writes() {
            tracing::info!("check mode, nothing written");
            return Ok(RebuildReport {
                mode: REBUILD_MODE,
                write: false,
                summary,
            });
        }

        let active = shards.write_shards(build.shard_documents(&generated_at))?;
        let removed = shards.prune_stale(&active)?;
        tracing::info!(
            written = active.len(),
            pruned = removed.len(),
            dir = %shards.path().display(),
            "shards materialized"
        );
        (summary, build.index)
    };

    registry.refresh(&generated_at);
    write_json(&registry_path, &registry)?;
    write_json(&index_path, &index)?;
    tracing::info!(index = %index_path.display(), "index written");

    Ok(RebuildReport {
        mode: REBUILD_MODE,
        write: true,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use errorbook_index_core::models::{Index, Shard, INDEX_API_VERSION, REGISTRY_API_VERSION};
    use serde_json::json;
    use std::path::Path;

    fn setup(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.root = root.to_path_buf();
        config.index.raw_base = Some("https://raw.example.com/acme/errorbook/main".to_string());
        write_json(
            &config.paths.registry_path(),
            &json!({
                "api_version": REGISTRY_API_VERSION,
                "generated_at": "2020-01-01T00:00:00.000Z",
                "total_entries": 7,
                "owner": "platform",
                "entries": [
                    {"id": "eb-1", "title": "Order approval timeout", "tags": ["order", "sla"]},
                    {"id": "eb-2", "symptom": "refund webhook retried", "status": "verified"}
                ]
            }),
        )
        .unwrap();
        config
    }

    #[test]
    fn test_check_mode_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let config = setup(tmp.path());
        let before = std::fs::read_to_string(config.paths.registry_path()).unwrap();

        let report = run_rebuild(&config, BuildMode::Check, None).unwrap();
        assert!(!report.write);
        assert_eq!(report.summary.total_entries, 2);

        assert!(!config.paths.index_path().exists());
        assert!(!config.paths.shards_path().exists());
        assert_eq!(std::fs::read_to_string(config.paths.registry_path()).unwrap(), before);
    }

    #[test]
    fn test_write_mode_materializes_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let config = setup(tmp.path());

        let report = run_rebuild(&config, BuildMode::Write, None).unwrap();
        assert!(report.write);

        let registry: Registry = read_json(&config.paths.registry_path()).unwrap();
        assert_eq!(registry.total_entries, Some(2));
        assert_eq!(registry.extra.get("owner"), Some(&json!("platform")));
        assert_eq!(registry.entries[1].fields().get("status"), Some(&json!("verified")));

        let index: Index = read_json(&config.paths.index_path()).unwrap();
        assert_eq!(index.api_version, INDEX_API_VERSION);
        assert_eq!(index.buckets.len(), report.summary.bucket_count);
        assert_eq!(index.token_to_bucket.len(), report.summary.token_count);
        assert_eq!(
            index.buckets["order"],
            "https://raw.example.com/acme/errorbook/main/registry/shards/order.json"
        );

        let order: Shard = read_json(&config.paths.shards_path().join("order.json")).unwrap();
        assert_eq!(order.entries.len(), 1);
        let payment: Shard = read_json(&config.paths.shards_path().join("payment.json")).unwrap();
        assert_eq!(payment.entries[0].display_id(), "eb-2");
    }

    #[test]
    fn test_write_mode_leaves_entries_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.root = tmp.path().to_path_buf();
        config.index.raw_base = Some("https://raw.example.com/acme/errorbook/main".to_string());
        let original = json!({"title": "Order stuck", "notes": null, "id": "eb-9", "tags": null});
        write_json(
            &config.paths.registry_path(),
            &json!({"api_version": REGISTRY_API_VERSION, "total_entries": 1, "entries": [original.clone()]}),
        )
        .unwrap();

        run_rebuild(&config, BuildMode::Write, None).unwrap();

        let registry: serde_json::Value = read_json(&config.paths.registry_path()).unwrap();
        assert_eq!(registry["entries"][0], original);
        let raw = std::fs::read_to_string(config.paths.shards_path().join("order.json")).unwrap();
        let title = raw.find("\"title\"").unwrap();
        let notes = raw.find("\"notes\": null").unwrap();
        let id = raw.find("\"id\"").unwrap();
        assert!(title < notes && notes < id);
    }

    #[test]
    fn test_write_mode_prunes_stale_shards() {
        let tmp = tempfile::tempdir().unwrap();
        let config = setup(tmp.path());
        let shards = config.paths.shards_path();
        std::fs::create_dir_all(&shards).unwrap();
        std::fs::write(shards.join("zzz.json"), "{}").unwrap();

        run_rebuild(&config, BuildMode::Write, None).unwrap();
        assert!(!shards.join("zzz.json").exists());
        assert!(shards.join("order.json").exists());
    }

    #[test]
    fn test_rejects_zero_min_token_length() {
        let tmp = tempfile::tempdir().unwrap();
        let config = setup(tmp.path());
        assert!(run_rebuild(&config, BuildMode::Check, Some(0)).is_err());
    }

    #[test]
    fn test_missing_registry_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.root = tmp.path().to_path_buf();
        let err = run_rebuild(&config, BuildMode::Write, None).unwrap_err();
        assert!(err.to_string().contains("errorbook-registry.json"));
        assert!(!config.paths.shards_path().exists());
    }
}
