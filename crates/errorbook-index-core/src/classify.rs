//! Token → bucket classification.
//!
//! # Resolution order
//!
//! 1. Seed dictionary: curated token → bucket pairs.
//! 2. Domain hints: ordered bucket → keyword lists, first match wins.
//! 3. First character of the token, when ASCII alphanumeric.
//! 4. [`MISC_BUCKET`].
//!
//! The vocabulary is an immutable [`Vocabulary`] value handed to
//! [`BucketClassifier::new`], so callers and tests can swap it without
//! touching any process-wide state.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bucket of last resort.
pub const MISC_BUCKET: &str = "misc";

/// One row of the domain-hint table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainHint {
    pub bucket: String,
    pub keywords: Vec<String>,
}

impl DomainHint {
    pub fn new(bucket: &str, keywords: &[&str]) -> Self {
        Self {
            bucket: bucket.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Seed dictionary and domain-hint table used by a [`BucketClassifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    seed: BTreeMap<String, String>,
    domain_hints: Vec<DomainHint>,
}

impl Vocabulary {
    /// Build a vocabulary, rejecting bucket names that could not be used as
    /// a shard file name.
    pub fn new(seed: BTreeMap<String, String>, domain_hints: Vec<DomainHint>) -> Result<Self> {
        for (token, bucket) in &seed {
            if token.is_empty() {
                bail!("vocabulary seed contains an empty token");
            }
            check_bucket_name(bucket)?;
        }
        for hint in &domain_hints {
            check_bucket_name(&hint.bucket)?;
        }
        Ok(Self { seed, domain_hints })
    }

    pub fn seed(&self) -> &BTreeMap<String, String> {
        &self.seed
    }

    pub fn domain_hints(&self) -> &[DomainHint] {
        &self.domain_hints
    }

    /// Distinct buckets named by the seed dictionary.
    pub fn seed_buckets(&self) -> BTreeSet<&str> {
        self.seed.values().map(String::as_str).collect()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        let seed = [
            ("order", "order"),
            ("approve", "order"),
            ("payment", "payment"),
            ("auth", "auth"),
        ]
        .into_iter()
        .map(|(t, b)| (t.to_string(), b.to_string()))
        .collect();

        let domain_hints = vec![
            DomainHint::new(
                "order",
                &["order", "approve", "fulfillment", "shipment", "inventory"],
            ),
            DomainHint::new(
                "payment",
                &["payment", "billing", "invoice", "refund", "settlement"],
            ),
            DomainHint::new("auth", &["auth", "login", "token", "permission", "access"]),
        ];

        Self { seed, domain_hints }
    }
}

fn check_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        bail!("vocabulary bucket names must not be empty");
    }
    if !bucket
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!(
            "vocabulary bucket '{}' must only contain [A-Za-z0-9_-]",
            bucket
        );
    }
    Ok(())
}

/// Deterministic, total token classifier.
#[derive(Debug, Clone, Default)]
pub struct BucketClassifier {
    vocabulary: Vocabulary,
}

impl BucketClassifier {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Bucket for `token`. Never empty.
    pub fn classify(&self, token: &str) -> String {
        if let Some(bucket) = self.vocabulary.seed.get(token) {
            return bucket.clone();
        }

        if let Some(hint) = self
            .vocabulary
            .domain_hints
            .iter()
            .find(|hint| hint.keywords.iter().any(|k| k == token))
        {
            return hint.bucket.clone();
        }

        match token.chars().next() {
            Some(first) if first.is_ascii_alphanumeric() => first.to_string(),
            _ => MISC_BUCKET.to_string(),
        }
    }
}
