// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `taskdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskdag",
    version,
    about = "Run a DAG of shell tasks once, in dependency order, with retries.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML, or JSON with a `.json` extension).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run tasks one at a time in topological order.
    #[arg(long)]
    pub sequential: bool,

    /// Override `[config].max_workers`.
    #[arg(long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKDAG_LOG`, then `[config].log_level`, is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the execution plan without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final status snapshot as JSON.
    #[arg(long)]
    pub json: bool,
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

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

