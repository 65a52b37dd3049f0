//! Resolution of the URL prefix shard locations are published under.
//!
//! First match wins:
//!
//! 1. `index.raw_base` from the config file
//! 2. `ERRORBOOK_REGISTRY_RAW_BASE`
//! 3. `GITHUB_REPOSITORY` (+ `ERRORBOOK_REGISTRY_BRANCH`, default `main`)
//! 4. the GitHub remote in `<root>/.git/config`
//! 5. [`FALLBACK_RAW_BASE`]
//!
//! Only the rebuild command consults this; the coverage gate and the
//! validator trust whatever locations the index already stores.

use std::path::Path;

use crate::config::Config;

pub const RAW_BASE_ENV: &str = "ERRORBOOK_REGISTRY_RAW_BASE";
pub const GITHUB_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";
pub const BRANCH_ENV: &str = "ERRORBOOK_REGISTRY_BRANCH";
pub const DEFAULT_BRANCH: &str = "main";
pub const FALLBACK_RAW_BASE: &str =
    "https://raw.githubusercontent.com/heguangyong/sce-errorbook-registry/main";

const GITHUB_RAW_HOST: &str = "https://raw.githubusercontent.com";

/// Resolve the raw base for `config` from the process environment.
pub fn resolve_raw_base(config: &Config) -> String {
    resolve_with(config.index.raw_base.as_deref(), &config.paths.root, |key| {
        std::env::var(key).ok()
    })
}

/// Resolution with an injectable environment lookup.
pub fn resolve_with<F>(configured: Option<&str>, root: &Path, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let resolved = if let Some(base) = configured.map(str::trim).filter(|b| !b.is_empty()) {
        tracing::debug!(source = "config", "raw base resolved");
        base.to_string()
    } else if let Some(base) = non_empty(env(RAW_BASE_ENV)) {
        tracing::debug!(source = RAW_BASE_ENV, "raw base resolved");
        base
    } else if let Some(repo) = non_empty(env(GITHUB_REPOSITORY_ENV)) {
        let branch = non_empty(env(BRANCH_ENV)).unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        tracing::debug!(source = GITHUB_REPOSITORY_ENV, %branch, "raw base resolved");
        format!("{}/{}/{}", GITHUB_RAW_HOST, repo, branch)
    } else if let Some(base) = git_remote_raw_base(root) {
        tracing::debug!(source = ".git/config", "raw base resolved");
        base
    } else {
        tracing::warn!("no raw base configured, falling back to {}", FALLBACK_RAW_BASE);
        FALLBACK_RAW_BASE.to_string()
    };

    resolved.trim_end_matches('/').to_string()
}

fn git_remote_raw_base(root: &Path) -> Option<String> {
    let path = root.join(".git").join("config");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "git config not readable");
            return None;
        }
    };
    first_remote_url(&content).and_then(github_raw_base)
}

/// Value of the first `url = ...` line of a git config file.
fn first_remote_url(content: &str) -> Option<&str> {
    content.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("url")?;
        let value = rest.trim_start().strip_prefix('=')?.trim();
        (!value.is_empty()).then_some(value)
    })
}

/// Map a GitHub HTTPS or SSH remote URL to its raw-content base on `main`.
fn github_raw_base(url: &str) -> Option<String> {
    let path = strip_prefix_ignore_case(url, "https://github.com/")
        .or_else(|| strip_prefix_ignore_case(url, "git@github.com:"))?;
    let path = path.strip_suffix(".git").unwrap_or(path);

    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') || repo.contains('.') {
        return None;
    }
    Some(format!("{}/{}/{}/{}", GITHUB_RAW_HOST, owner, repo, DEFAULT_BRANCH))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}
