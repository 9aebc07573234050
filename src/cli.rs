// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `pipebuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipebuild",
    version,
    about = "Build shell scripts for file-based processing pipelines.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEBUILD_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate the pipeline script (and JSON export) from a config file.
    Build {
        /// Path to the pipeline description (TOML).
        #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Re-run tasks whose outputs already exist.
        #[arg(long)]
        clobber: bool,

        /// Print what each task would do without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the stages of the pipeline and their supernodes.
    Stages {
        #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Stage by distance from the final outputs instead of the inputs.
        #[arg(long)]
        bottom_up: bool,
    },

    /// Run a command, recording stdout, stderr and exit code under PREFIX.
    Wrap {
        /// Metadata file prefix.
        prefix: PathBuf,

        /// Command and its arguments.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Combine the latest export of several subjects into one JSON file.
    Gather {
        #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Dataset whose log folder holds each subject's export list.
        #[arg(long)]
        dataset: String,

        /// Template field holding the subject identifier.
        #[arg(long, default_value = "subj")]
        field: String,

        /// Output file (`.json`).
        #[arg(long, short)]
        output: PathBuf,

        /// Subjects to gather.
        #[arg(required = true)]
        subjects: Vec<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
