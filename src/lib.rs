//! # Errorbook Index
//!
//! Builds and verifies the sharded index of the errorbook registry, a
//! JSON registry of past errors with their symptoms, root causes and fixes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌──────────────────┐
//! │ registry │──▶│ tokenizer │──▶│ classifier │──▶│ index + shards   │
//! └────┬─────┘   └───────────┘   └────────────┘   └────────┬─────────┘
//!      │                                                   │
//!      └───────────────┬───────────────────────────────────┘
//!                      ▼
//!            ┌───────────────────┐
//!            │ coverage / verify │
//!            └───────────────────┘
//! ```
//!
//! The algorithms live in `errorbook-index-core`; this crate adds the
//! file I/O, configuration and the `errorbook` command line.
//!
//! ## Quick Start
//!
//! ```bash
//! errorbook rebuild --check        # dry run, print counts
//! errorbook rebuild --write        # write shards, registry and index
//! errorbook coverage --min-coverage 90
//! errorbook validate
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`storage`] | JSON document reading and writing |
//! | [`raw_base`] | Shard URL prefix resolution |
//! | [`shard_dir`] | Shard file materialization and pruning |
//! | [`rebuild`] | `rebuild` command |
//! | [`coverage`] | `coverage` command |
//! | [`validate`] | `validate` command |

pub mod config;
pub mod coverage;
pub mod raw_base;
pub mod rebuild;
pub mod shard_dir;
pub mod storage;
pub mod validate;
