//! # Errorbook CLI (`errorbook`)
//!
//! ## Usage
//!
//! ```bash
//! errorbook --config ./config/errorbook.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `errorbook rebuild --check` | Compute the index and print counts without writing |
//! | `errorbook rebuild --write` | Write shards, prune stale ones, rewrite registry and index |
//! | `errorbook coverage` | Run the coverage gate; exit 2 when it fails |
//! | `errorbook validate` | Check registry, index and shard consistency |
//!
//! ## Exit status
//!
//! `0` on success, `1` on any error, `2` when the coverage gate ran and
//! failed.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use errorbook_index::config;
use errorbook_index::coverage::{self, ERROR_EXIT_CODE, GATE_FAILED_EXIT_CODE};
use errorbook_index::rebuild;
use errorbook_index::validate::{self, VALIDATION_PASSED};
use errorbook_index_core::build::BuildMode;
use errorbook_index_core::validate::ValidationMode;

/// Errorbook index CLI: build, gate and validate the sharded registry
/// index.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "errorbook",
    about = "Build, gate and validate the sharded errorbook registry index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/errorbook.toml")]
    config: PathBuf,

    /// Increase log verbosity (can be repeated: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate the index and its shard files from the registry.
    ///
    /// One of `--check` or `--write` is required. With `--check` the
    /// rebuild is computed and reported but nothing is written.
    Rebuild {
        /// Report counts without touching any file.
        #[arg(long)]
        check: bool,

        /// Write shards, delete stale shards, rewrite registry and index.
        #[arg(long)]
        write: bool,

        /// Override `index.min_token_length` from the config.
        #[arg(long)]
        min_token_length: Option<usize>,
    },

    /// Run the index coverage gate.
    ///
    /// Prints a JSON report. Exits with status 2 when coverage is below the
    /// threshold.
    Coverage {
        /// Minimum coverage percent. Overrides `ERRORBOOK_INDEX_MIN_COVERAGE`
        /// and `coverage.min_coverage`; ignored when not a number.
        #[arg(long, allow_hyphen_values = true)]
        min_coverage: Option<String>,
    },

    /// Check registry, index and shard files for consistency.
    Validate {
        /// Skip shard file checks (shards not materialized yet).
        #[arg(long)]
        loose: bool,
    },

    /// Generate shell completions.
    #[command(hide = true)]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("ERRORBOOK_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> anyhow::Result<()> {
    // clap exits with 2 on usage errors, which is reserved for a failed gate.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { ERROR_EXIT_CODE } else { 0 });
        }
    };
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "errorbook", &mut std::io::stdout());
        return Ok(());
    }

    // Usage errors surface before any file is read.
    let build_mode = match &cli.command {
        Commands::Rebuild { check, write, .. } => Some(BuildMode::from_flags(*check, *write)?),
        _ => None,
    };

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Rebuild {
            min_token_length, ..
        } => {
            let mode = build_mode.unwrap_or(BuildMode::Check);
            let report = rebuild::run_rebuild(&cfg, mode, min_token_length)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Coverage { min_coverage } => {
            let report = coverage::run_coverage(&cfg, min_coverage.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.passed {
                std::process::exit(GATE_FAILED_EXIT_CODE);
            }
        }
        Commands::Validate { loose } => {
            let mode = if loose {
                ValidationMode::Loose
            } else {
                ValidationMode::Strict
            };
            validate::run_validate(&cfg, mode)?;
            println!("{}", VALIDATION_PASSED);
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_flags() {
        let cli = Cli::parse_from(["errorbook", "rebuild", "--write", "--min-token-length", "3"]);
        match cli.command {
            Commands::Rebuild {
                check,
                write,
                min_token_length,
            } => {
                assert!(!check);
                assert!(write);
                assert_eq!(min_token_length, Some(3));
            }
            _ => panic!("expected rebuild command"),
        }
        assert_eq!(cli.config, PathBuf::from("./config/errorbook.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["errorbook", "coverage", "--min-coverage", "90", "-vv", "--config", "x.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        match cli.command {
            Commands::Coverage { min_coverage } => assert_eq!(min_coverage.as_deref(), Some("90")),
            _ => panic!("expected coverage command"),
        }
    }

    #[test]
    fn test_min_coverage_is_taken_verbatim() {
        for raw in ["abc", "-5", "NaN"] {
            let cli = Cli::try_parse_from(["errorbook", "coverage", "--min-coverage", raw]).unwrap();
            match cli.command {
                Commands::Coverage { min_coverage } => assert_eq!(min_coverage.as_deref(), Some(raw)),
                _ => panic!("expected coverage command"),
            }
        }
    }

    #[test]
    fn test_usage_errors_are_reported_to_stderr() {
        let err = Cli::try_parse_from(["errorbook", "coverage", "--bogus"]).err().unwrap();
        assert!(err.use_stderr());
        let help = Cli::try_parse_from(["errorbook", "--help"]).err().unwrap();
        assert!(!help.use_stderr());
    }
}
