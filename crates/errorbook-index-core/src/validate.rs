//! Consistency validator.
//!
//! Checks, in order, stopping at the first violation:
//!
//! 1. Registry and index schema tags.
//! 2. Registry `total_entries` against the actual entry count.
//! 3. Every bucket target is a non-empty string.
//! 4. Every bucket target is a shard path whose shard exists, carries the
//!    registry schema tag, names the same bucket and holds as many entries
//!    as it declares. Skipped in [`ValidationMode::Loose`].
//! 5. Every `token_to_bucket` value is a key of `buckets`.

use serde::Serialize;
use thiserror::Error;

use crate::models::{Index, Registry, INDEX_API_VERSION, REGISTRY_API_VERSION};
use crate::shards::{shard_file_from_location, ShardLookup, ShardSource};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("registry api_version invalid: expected '{expected}', found '{found}'")]
    RegistryApiVersion { expected: &'static str, found: String },

    #[error("index api_version invalid: expected '{expected}', found '{found}'")]
    IndexApiVersion { expected: &'static str, found: String },

    #[error("registry.total_entries must be a number")]
    MissingTotalEntries,

    #[error("registry.total_entries is {declared} but registry.entries holds {actual}")]
    EntryCountMismatch { declared: u64, actual: usize },

    #[error("bucket {bucket} target missing")]
    EmptyBucketTarget { bucket: String },

    #[error("bucket {bucket} target '{location}' is not a shard path (expected '.../registry/shards/<bucket>.json')")]
    NotAShardPath { bucket: String, location: String },

    #[error("bucket {bucket} shard file not found: {file}")]
    ShardMissing { bucket: String, file: String },

    #[error("bucket {bucket} shard file {file} unreadable: {reason}")]
    ShardUnreadable {
        bucket: String,
        file: String,
        reason: String,
    },

    #[error("shard {file} api_version invalid: expected '{expected}', found '{found}'")]
    ShardApiVersion {
        file: String,
        expected: &'static str,
        found: String,
    },

    #[error("shard {file} declares bucket '{found}' but is referenced by bucket '{bucket}'")]
    ShardBucketMismatch {
        file: String,
        bucket: String,
        found: String,
    },

    #[error("shard {file} declares {declared} entries but holds {actual}")]
    ShardCountMismatch {
        file: String,
        declared: u64,
        actual: usize,
    },

    #[error("token_to_bucket maps token '{token}' to unknown bucket '{bucket}'")]
    UnknownBucket { token: String, bucket: String },
}

/// How much of the on-disk state to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Every check, including shard files.
    Strict,
    /// Skip shard files, for indexes whose shards are not materialized yet.
    Loose,
}

/// Counts of what a successful validation looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub entries: usize,
    pub buckets: usize,
    pub tokens: usize,
    pub shards_checked: usize,
}

pub fn validate(
    registry: &Registry,
    index: &Index,
    shards: &dyn ShardSource,
    mode: ValidationMode,
) -> Result<ValidationSummary, ValidationError> {
    if registry.api_version != REGISTRY_API_VERSION {
        return Err(ValidationError::RegistryApiVersion {
            expected: REGISTRY_API_VERSION,
            found: registry.api_version.clone(),
        });
    }
    if index.api_version != INDEX_API_VERSION {
        return Err(ValidationError::IndexApiVersion {
            expected: INDEX_API_VERSION,
            found: index.api_version.clone(),
        });
    }

    let declared = registry
        .total_entries
        .ok_or(ValidationError::MissingTotalEntries)?;
    if declared != registry.entries.len() as u64 {
        return Err(ValidationError::EntryCountMismatch {
            declared,
            actual: registry.entries.len(),
        });
    }

    if let Some((bucket, _)) = index
        .buckets
        .iter()
        .find(|(_, target)| target.is_empty())
    {
        return Err(ValidationError::EmptyBucketTarget {
            bucket: bucket.clone(),
        });
    }

    let mut shards_checked = 0;
    if mode == ValidationMode::Strict {
        for (bucket, location) in &index.buckets {
            check_shard(bucket, location, shards)?;
            shards_checked += 1;
        }
    }

    for (token, bucket) in &index.token_to_bucket {
        if !index.buckets.contains_key(bucket) {
            return Err(ValidationError::UnknownBucket {
                token: token.clone(),
                bucket: bucket.clone(),
            });
        }
    }

    Ok(ValidationSummary {
        entries: registry.entries.len(),
        buckets: index.buckets.len(),
        tokens: index.token_to_bucket.len(),
        shards_checked,
    })
}

fn check_shard(bucket: &str, location: &str, shards: &dyn ShardSource) -> Result<(), ValidationError> {
    let file = shard_file_from_location(location).ok_or_else(|| ValidationError::NotAShardPath {
        bucket: bucket.to_string(),
        location: location.to_string(),
    })?;

    let shard = match shards.load(file) {
        ShardLookup::Found(shard) => shard,
        ShardLookup::Missing => {
            return Err(ValidationError::ShardMissing {
                bucket: bucket.to_string(),
                file: file.to_string(),
            })
        }
        ShardLookup::Unreadable(reason) => {
            return Err(ValidationError::ShardUnreadable {
                bucket: bucket.to_string(),
                file: file.to_string(),
                reason,
            })
        }
    };

    if shard.api_version != REGISTRY_API_VERSION {
        return Err(ValidationError::ShardApiVersion {
            file: file.to_string(),
            expected: REGISTRY_API_VERSION,
            found: shard.api_version,
        });
    }
    if shard.bucket != bucket {
        return Err(ValidationError::ShardBucketMismatch {
            file: file.to_string(),
            bucket: bucket.to_string(),
            found: shard.bucket,
        });
    }
    if shard.source.total_entries != shard.entries.len() as u64 {
        return Err(ValidationError::ShardCountMismatch {
            file: file.to_string(),
            declared: shard.source.total_entries,
            actual: shard.entries.len(),
        });
    }
    Ok(())
}
