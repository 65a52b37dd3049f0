//! TOML configuration.
//!
//! Every section is optional; a missing config file yields
//! [`Config::default`]. Relative paths resolve against `paths.root`, which
//! itself resolves against the working directory.
//!
//! ```toml
//! [paths]
//! root = "."
//! registry = "registry/errorbook-registry.json"
//! index = "registry/errorbook-registry.index.json"
//! shards_dir = "registry/shards"
//!
//! [index]
//! min_token_length = 2
//! raw_base = "https://raw.githubusercontent.com/acme/errorbook/main"
//!
//! [coverage]
//! min_coverage = 85.0
//!
//! [vocabulary]
//! seed = { order = "order", approve = "order" }
//!
//! [[vocabulary.domain_hints]]
//! bucket = "order"
//! keywords = ["order", "approve", "shipment"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use errorbook_index_core::classify::{BucketClassifier, DomainHint, Vocabulary};
use errorbook_index_core::models::DEFAULT_MIN_TOKEN_LENGTH;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub vocabulary: Option<VocabularyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
    #[serde(default = "default_index")]
    pub index: PathBuf,
    #[serde(default = "default_shards_dir")]
    pub shards_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            registry: default_registry(),
            index: default_index(),
            shards_dir: default_shards_dir(),
        }
    }
}

impl PathsConfig {
    pub fn registry_path(&self) -> PathBuf {
        self.root.join(&self.registry)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.index)
    }

    pub fn shards_path(&self) -> PathBuf {
        self.root.join(&self.shards_dir)
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_registry() -> PathBuf {
    PathBuf::from("registry/errorbook-registry.json")
}
fn default_index() -> PathBuf {
    PathBuf::from("registry/errorbook-registry.index.json")
}
fn default_shards_dir() -> PathBuf {
    PathBuf::from("registry/shards")
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
    /// Prefix of published shard URLs. Resolved from the environment or the
    /// git remote when unset.
    #[serde(default)]
    pub raw_base: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
            raw_base: None,
        }
    }
}

fn default_min_token_length() -> usize {
    DEFAULT_MIN_TOKEN_LENGTH
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CoverageConfig {
    #[serde(default)]
    pub min_coverage: Option<f64>,
}

/// Replacement for the built-in classifier vocabulary.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub seed: BTreeMap<String, String>,
    #[serde(default)]
    pub domain_hints: Vec<DomainHint>,
}

impl Config {
    /// Classifier built from `[vocabulary]`, or the built-in vocabulary.
    pub fn classifier(&self) -> Result<BucketClassifier> {
        let vocabulary = match &self.vocabulary {
            Some(v) => Vocabulary::new(v.seed.clone(), v.domain_hints.clone())
                .context("Invalid [vocabulary] section")?,
            None => Vocabulary::default(),
        };
        Ok(BucketClassifier::new(vocabulary))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.index.min_token_length == 0 {
        anyhow::bail!("index.min_token_length must be >= 1");
    }

    if let Some(min) = config.coverage.min_coverage {
        if !(0.0..=100.0).contains(&min) {
            anyhow::bail!("coverage.min_coverage must be in [0.0, 100.0]");
        }
    }

    if let Some(base) = &config.index.raw_base {
        if base.trim().is_empty() {
            anyhow::bail!("index.raw_base must not be empty when set");
        }
    }

    config.classifier()?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("errorbook.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let (_tmp, path) = write_config("");
        let config = load_config(&path).unwrap();
        assert_eq!(config.index.min_token_length, 2);
        assert_eq!(
            config.paths.registry_path(),
            PathBuf::from("./registry/errorbook-registry.json")
        );
        assert!(config.coverage.min_coverage.is_none());
        assert!(config.vocabulary.is_none());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_or_default(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config.paths.shards_path(), PathBuf::from("./registry/shards"));
        assert!(load_config(&tmp.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_paths_resolve_against_root() {
        let (_tmp, path) = write_config(
            r#"
[paths]
root = "/srv/errorbook"
shards_dir = "out/shards"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.paths.shards_path(), PathBuf::from("/srv/errorbook/out/shards"));
        assert_eq!(
            config.paths.index_path(),
            PathBuf::from("/srv/errorbook/registry/errorbook-registry.index.json")
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        let (_tmp, path) = write_config("[index]\nmin_token_length = 0\n");
        assert!(load_config(&path).is_err());

        let (_tmp, path) = write_config("[coverage]\nmin_coverage = 120.0\n");
        assert!(load_config(&path).is_err());

        let (_tmp, path) = write_config("[index]\nraw_base = \"  \"\n");
        assert!(load_config(&path).is_err());

        let (_tmp, path) = write_config("[vocabulary]\nseed = { order = \"a/b\" }\n");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("vocabulary"));
    }

    #[test]
    fn test_vocabulary_override() {
        let (_tmp, path) = write_config(
            r#"
[vocabulary]
seed = { checkout = "cart" }

[[vocabulary.domain_hints]]
bucket = "ops"
keywords = ["deploy", "rollback"]
"#,
        );
        let classifier = load_config(&path).unwrap().classifier().unwrap();
        assert_eq!(classifier.classify("checkout"), "cart");
        assert_eq!(classifier.classify("rollback"), "ops");
        assert_eq!(classifier.classify("order"), "o");
    }
}
