//! Index builder.
//!
//! Computes, entirely in memory, the token → bucket table, the bucket →
//! shard location table and the entries each shard holds. Writing the
//! result is left to the caller; [`BuildMode`] tells it whether to.
//!
//! # Algorithm
//!
//! 1. Tokenize every entry.
//! 2. Classify the union of all tokens plus the seed tokens. Classification
//!    depends only on the token, so the table is the same for any entry
//!    order.
//! 3. Pre-create an empty shard for every seed bucket.
//! 4. Walk entries in registry order and reference each one from every
//!    bucket its tokens reach, once per bucket.
//! 5. Point every shard bucket at its published location.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::BucketClassifier;
use crate::models::{Entry, Index, Registry, INDEX_API_VERSION};
use crate::shards::{shard_location, ShardDocument};
use crate::tokenize::tokenize;

/// Whether a rebuild only reports or also writes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Check,
    Write,
}

impl BuildMode {
    /// Resolve the mode from the `--check` / `--write` flags. Check wins
    /// when both are set; neither is a usage error.
    pub fn from_flags(check: bool, write: bool) -> Result<Self> {
        match (check, write) {
            (true, _) => Ok(BuildMode::Check),
            (false, true) => Ok(BuildMode::Write),
            (false, false) => bail!("missing --write (or use --check)"),
        }
    }

    pub fn writes(self) -> bool {
        self == BuildMode::Write
    }
}

/// Inputs of a rebuild that do not come from the registry.
#[derive(Debug, Clone)]
pub struct BuildOptions<'a> {
    pub min_token_length: usize,
    /// Prefix of every shard location.
    pub raw_base: &'a str,
    pub generated_at: &'a str,
}

/// Counts reported after a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub total_entries: usize,
    pub bucket_count: usize,
    pub token_count: usize,
}

/// Result of [`build_index`]. Shards reference the registry's entries.
#[derive(Debug)]
pub struct IndexBuild<'a> {
    pub index: Index,
    pub shards: BTreeMap<String, Vec<&'a Entry>>,
    total_entries: usize,
}

impl<'a> IndexBuild<'a> {
    pub fn summary(&self) -> BuildSummary {
        BuildSummary {
            total_entries: self.total_entries,
            bucket_count: self.index.buckets.len(),
            token_count: self.index.token_to_bucket.len(),
        }
    }

    /// Serializable shard documents, one per bucket, in bucket order.
    pub fn shard_documents<'b>(
        &'b self,
        generated_at: &'b str,
    ) -> impl Iterator<Item = ShardDocument<'b>> + 'b {
        self.shards
            .iter()
            .map(move |(bucket, entries)| ShardDocument::new(bucket, entries, generated_at))
    }
}

/// Build the index and shard membership for `registry`.
pub fn build_index<'a>(
    registry: &'a Registry,
    classifier: &BucketClassifier,
    options: &BuildOptions<'_>,
) -> IndexBuild<'a> {
    let entry_tokens: Vec<BTreeSet<String>> = registry
        .entries
        .iter()
        .map(|entry| tokenize(entry, options.min_token_length))
        .collect();

    let vocabulary = classifier.vocabulary();
    let token_to_bucket: BTreeMap<String, String> = vocabulary
        .seed()
        .keys()
        .chain(entry_tokens.iter().flatten())
        .map(|token| (token.clone(), classifier.classify(token)))
        .collect();

    let mut shards: BTreeMap<String, Vec<&'a Entry>> = vocabulary
        .seed_buckets()
        .into_iter()
        .map(|bucket| (bucket.to_string(), Vec::new()))
        .collect();

    for (entry, tokens) in registry.entries.iter().zip(&entry_tokens) {
        let reached: BTreeSet<&str> = tokens
            .iter()
            .filter_map(|token| token_to_bucket.get(token))
            .map(String::as_str)
            .collect();
        for bucket in reached {
            shards.entry(bucket.to_string()).or_default().push(entry);
        }
    }

    let buckets = shards
        .keys()
        .map(|bucket| (bucket.clone(), shard_location(options.raw_base, bucket)))
        .collect();

    IndexBuild {
        index: Index {
            api_version: INDEX_API_VERSION.to_string(),
            generated_at: Some(options.generated_at.to_string()),
            min_token_length: Some(options.min_token_length),
            token_to_bucket,
            buckets,
        },
        shards,
        total_entries: registry.entries.len(),
    }
}
