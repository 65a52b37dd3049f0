//! Directory holding the materialized shard files.
//!
//! Writes one `<bucket>.json` per shard, prunes shard files the current
//! index no longer references, and serves shards back to the validator
//! through [`ShardSource`].

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use errorbook_index_core::models::Shard;
use errorbook_index_core::shards::{shard_file_name, ShardDocument, ShardLookup, ShardSource, SHARD_FILE_SUFFIX};

use crate::storage::{read_json, write_json};

#[derive(Debug, Clone)]
pub struct ShardDir {
    dir: PathBuf,
}

impl ShardDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write every shard and return the set of file names written.
    pub fn write_shards<'a, I>(&self, shards: I) -> Result<BTreeSet<String>>
    where
        I: IntoIterator<Item = ShardDocument<'a>>,
    {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create shard directory {}", self.dir.display()))?;

        let mut written = BTreeSet::new();
        for shard in shards {
            let file_name = shard_file_name(shard.bucket);
            write_json(&self.dir.join(&file_name), &shard)?;
            tracing::debug!(bucket = shard.bucket, entries = shard.entries.len(), "wrote shard");
            written.insert(file_name);
        }
        Ok(written)
    }

    /// Shard files currently in the directory. Only direct children ending
    /// in `.json` count.
    pub fn list(&self) -> Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        if !self.dir.exists() {
            return Ok(files);
        }
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("Failed to list {}", self.dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(SHARD_FILE_SUFFIX) {
                files.insert(name.into_owned());
            }
        }
        Ok(files)
    }

    /// Delete every shard file not in `active`. Returns the removed names.
    pub fn prune_stale(&self, active: &BTreeSet<String>) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for name in self.list()?.into_iter().filter(|name| !active.contains(name)) {
            let path = self.dir.join(&name);
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale shard {}", path.display()))?;
            tracing::info!(file = %name, "removed stale shard");
            removed.push(name);
        }
        Ok(removed)
    }
}

impl ShardSource for ShardDir {
    fn load(&self, file_name: &str) -> ShardLookup {
        let path = self.dir.join(file_name);
        if !path.is_file() {
            return ShardLookup::Missing;
        }
        match read_json::<Shard>(&path) {
            Ok(shard) => ShardLookup::Found(shard),
            Err(e) => ShardLookup::Unreadable(format!("{:#}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errorbook_index_core::models::Entry;

    const NOW: &str = "2026-10-19T00:00:00.000Z";

    #[test]
    fn test_write_prune_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ShardDir::new(tmp.path().join("shards"));

        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("README.md"), "keep me").unwrap();

        let entry: Entry = serde_json::from_value(serde_json::json!({"id": "eb-1"})).unwrap();
        let entries = vec![&entry];
        let written = dir
            .write_shards(vec![ShardDocument::new("a", &entries, NOW)])
            .unwrap();
        assert_eq!(written.iter().collect::<Vec<_>>(), vec!["a.json"]);

        let removed = dir.prune_stale(&written).unwrap();
        assert_eq!(removed, vec!["b.json".to_string()]);
        assert!(!dir.path().join("b.json").exists());
        assert!(dir.path().join("README.md").exists());

        match dir.load("a.json") {
            ShardLookup::Found(shard) => {
                assert_eq!(shard.bucket, "a");
                assert_eq!(shard.source.total_entries, 1);
            }
            other => panic!("expected shard, got {:?}", other),
        }
        assert_eq!(dir.load("b.json"), ShardLookup::Missing);
    }

    #[test]
    fn test_unreadable_shard() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ShardDir::new(tmp.path());
        std::fs::write(tmp.path().join("x.json"), "{\"bucket\": \"x\"}").unwrap();
        match dir.load("x.json") {
            ShardLookup::Unreadable(reason) => assert!(reason.contains("x.json")),
            other => panic!("expected unreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ShardDir::new(tmp.path().join("absent"));
        assert!(dir.list().unwrap().is_empty());
    }
}
