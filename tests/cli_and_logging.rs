// tests/cli_and_logging.rs

use std::path::{Path, PathBuf};

use clap::Parser;
use taskdag::cli::{CliArgs, LogLevel};
use taskdag::config_root_dir;
use taskdag::logging::{parse_level_str, resolve_level};
use tracing::Level;

#[test]
fn cli_defaults() {
    let args = CliArgs::parse_from(["taskdag"]);
    assert_eq!(args.config, PathBuf::from("Taskdag.toml"));
    assert!(!args.sequential);
    assert!(args.max_workers.is_none());
    assert!(args.log_level.is_none());
    assert!(!args.dry_run);
    assert!(!args.json);
}

#[test]
fn cli_overrides() {
    let args = CliArgs::parse_from([
        "taskdag",
        "--config",
        "ci/pipeline.json",
        "--sequential",
        "--max-workers",
        "8",
        "--log-level",
        "debug",
        "--dry-run",
        "--json",
    ]);
    assert_eq!(args.config, PathBuf::from("ci/pipeline.json"));
    assert!(args.sequential);
    assert_eq!(args.max_workers, Some(8));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
    assert!(args.json);
}

#[test]
fn cli_rejects_unknown_level() {
    assert!(CliArgs::try_parse_from(["taskdag", "--log-level", "loud"]).is_err());
}

#[test]
fn level_strings_are_case_insensitive() {
    assert_eq!(parse_level_str("WARNING"), Some(Level::WARN));
    assert_eq!(parse_level_str(" Critical "), Some(Level::ERROR));
    assert_eq!(parse_level_str("trace"), Some(Level::TRACE));
    assert_eq!(parse_level_str("verbose"), None);
}

#[test]
fn cli_flag_wins_over_env_and_config() {
    let level = resolve_level(Some(LogLevel::Trace), Some("error"), Some("warn"));
    assert_eq!(level, Level::TRACE);
}

#[test]
fn env_then_config_then_default() {
    assert_eq!(resolve_level(None, Some("debug"), Some("warn")), Level::DEBUG);
    assert_eq!(resolve_level(None, Some("bogus"), Some("warn")), Level::WARN);
    assert_eq!(resolve_level(None, None, None), Level::INFO);
}

#[test]
fn commands_run_next_to_the_config_file() {
    assert_eq!(
        config_root_dir(Path::new("configs/Taskdag.toml")),
        PathBuf::from("configs")
    );
    let bare = config_root_dir(Path::new("Taskdag.toml"));
    assert!(!bare.as_os_str().is_empty());
}
