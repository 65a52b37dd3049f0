//! # Errorbook Index Core
//!
//! Pure indexing and verification logic for the errorbook registry: entry
//! model, tokenizer, bucket classifier, index builder, coverage gate and
//! consistency validator.
//!
//! This crate does no filesystem I/O, reads no environment variables and
//! keeps no global state. Reading and writing documents, resolving the
//! shard URL prefix and wiring exit codes belong to the application crate.

pub mod build;
pub mod classify;
pub mod coverage;
pub mod models;
pub mod shards;
pub mod tokenize;
pub mod validate;
