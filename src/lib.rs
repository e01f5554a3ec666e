// src/lib.rs

//! taskdag: run a set of interdependent tasks once, in dependency order,
//! sequentially or on a bounded worker pool, with per-task retries and
//! live status reporting.
//!
//! Library users build an [`engine::Orchestrator`] and register
//! [`dag::TaskSpec`]s directly; the `taskdag` binary builds one from a
//! config file of shell commands.

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::engine::{Orchestrator, TracingSink};
use crate::types::{RunMode, TaskName, TaskValue};

/// High-level entry point used by `main.rs`.
///
/// Builds the orchestrator from `cfg`, applies CLI overrides, runs once and
/// prints results plus a status summary. Ctrl-C aborts the run.
pub async fn run(args: CliArgs, cfg: ConfigFile) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = apply_overrides(&args, cfg);

    let root_dir = config_root_dir(&config_path);
    let orch = Orchestrator::from_config(&cfg, &root_dir, Arc::new(TracingSink))?;

    if args.dry_run {
        print_dry_run(&orch, &cfg)?;
        return Ok(());
    }

    let mode = if args.sequential {
        RunMode::Sequential
    } else {
        cfg.mode()
    };
    info!(%mode, tasks = orch.len(), root = %root_dir.display(), "starting run");

    let outcome = tokio::select! {
        res = orch.run(mode) => res,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            bail!("interrupted by Ctrl-C");
        }
    };

    let results = match outcome {
        Ok(results) => results,
        Err(err) => {
            print_summary(&orch, &orch.results(), args.json)?;
            return Err(err.into());
        }
    };

    print_summary(&orch, &results, args.json)?;
    Ok(())
}

fn apply_overrides(args: &CliArgs, mut cfg: ConfigFile) -> ConfigFile {
    if let Some(max_workers) = args.max_workers {
        debug!(max_workers, "overriding [config].max_workers from CLI");
        cfg.config.max_workers = max_workers.max(1);
    }
    cfg
}

/// Directory commands run in: the config file's parent, or the current
/// working directory for a bare filename.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_summary(
    orch: &Orchestrator,
    results: &HashMap<TaskName, TaskValue>,
    json: bool,
) -> Result<()> {
    let status = orch.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("results ({}):", results.len());
    for name in orch.task_names() {
        if let Some(value) = results.get(&name) {
            println!("  {name}: {value}");
        }
    }
    println!();
    print!("{status}");
    Ok(())
}

fn print_dry_run(orch: &Orchestrator, cfg: &ConfigFile) -> Result<()> {
    let order = orch.plan()?;

    println!("taskdag dry-run");
    println!("  config.mode = {}", cfg.config.mode);
    println!("  config.max_workers = {}", cfg.config.max_workers);
    println!("  config.retry_delay = {}", cfg.config.retry_delay);
    println!();

    println!("plan ({}):", order.len());
    for (i, name) in order.iter().enumerate() {
        println!("  {}. {name}", i + 1);
        let Some(task) = cfg.task.get(name) else {
            continue;
        };
        println!("      cmd: {}", task.cmd);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if task.retries > 0 {
            println!("      retries: {}", task.retries);
        }
        if let Some(ref timeout) = task.timeout {
            println!("      timeout: {timeout}");
        }
        if let Some(ref description) = task.description {
            println!("      description: {description}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
