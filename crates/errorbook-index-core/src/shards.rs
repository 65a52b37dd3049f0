//! Shard naming and shard storage abstraction.
//!
//! Every bucket is published as `<raw_base>/registry/shards/<bucket>.json`.
//! The [`ShardSource`] trait lets the validator look shards up without
//! knowing where they live; [`InMemoryShards`] backs tests and dry runs,
//! the application crate provides a directory-backed implementation.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Entry, Shard, ShardCounts, REGISTRY_API_VERSION};

/// Path segment every shard location must contain.
pub const SHARD_PATH_MARKER: &str = "/registry/shards/";
/// File suffix of every shard.
pub const SHARD_FILE_SUFFIX: &str = ".json";

/// File name of the shard holding `bucket`.
pub fn shard_file_name(bucket: &str) -> String {
    format!("{}{}", bucket, SHARD_FILE_SUFFIX)
}

/// Published location of the shard holding `bucket`.
pub fn shard_location(raw_base: &str, bucket: &str) -> String {
    format!(
        "{}{}{}",
        raw_base.trim_end_matches('/'),
        SHARD_PATH_MARKER,
        shard_file_name(bucket)
    )
}

/// The shard file name a location points at, if the location has the
/// shape produced by [`shard_location`].
pub fn shard_file_from_location(location: &str) -> Option<&str> {
    let (_, file) = location.rsplit_once(SHARD_PATH_MARKER)?;
    if file.len() <= SHARD_FILE_SUFFIX.len() || !file.ends_with(SHARD_FILE_SUFFIX) || file.contains('/') {
        return None;
    }
    Some(file)
}

/// Serializable view of a shard whose entries are borrowed from the
/// registry.
#[derive(Debug, Serialize)]
pub struct ShardDocument<'a> {
    pub api_version: &'static str,
    pub generated_at: &'a str,
    pub bucket: &'a str,
    pub source: ShardCounts,
    pub entries: &'a [&'a Entry],
}

impl<'a> ShardDocument<'a> {
    pub fn new(bucket: &'a str, entries: &'a [&'a Entry], generated_at: &'a str) -> Self {
        Self {
            api_version: REGISTRY_API_VERSION,
            generated_at,
            bucket,
            source: ShardCounts {
                total_entries: entries.len() as u64,
            },
            entries,
        }
    }
}

/// Outcome of looking a shard up by file name.
#[derive(Debug, Clone, PartialEq)]
pub enum ShardLookup {
    Found(Shard),
    Missing,
    /// The shard exists but could not be read or parsed.
    Unreadable(String),
}

/// Read access to materialized shards, keyed by file name.
pub trait ShardSource {
    fn load(&self, file_name: &str) -> ShardLookup;
}

/// In-memory [`ShardSource`] for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShards {
    shards: BTreeMap<String, Shard>,
}

impl InMemoryShards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `shard` under its bucket's file name.
    pub fn insert(&mut self, shard: Shard) {
        self.shards.insert(shard_file_name(&shard.bucket), shard);
    }

    /// Store `shard` under an explicit file name.
    pub fn insert_as(&mut self, file_name: &str, shard: Shard) {
        self.shards.insert(file_name.to_string(), shard);
    }

    pub fn remove(&mut self, file_name: &str) -> Option<Shard> {
        self.shards.remove(file_name)
    }

    pub fn get_mut(&mut self, file_name: &str) -> Option<&mut Shard> {
        self.shards.get_mut(file_name)
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

impl ShardSource for InMemoryShards {
    fn load(&self, file_name: &str) -> ShardLookup {
        match self.shards.get(file_name) {
            Some(shard) => ShardLookup::Found(shard.clone()),
            None => ShardLookup::Missing,
        }
    }
}
