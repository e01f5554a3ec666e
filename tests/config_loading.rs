// tests/config_loading.rs
mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::init_tracing;

use std::error::Error;
use std::io::Write;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};
use taskdag::config::{ConfigFile, default_config_path, load_and_validate, parse_duration};
use taskdag::errors::TaskdagError;
use taskdag::types::RunMode;

type TestResult = Result<(), Box<dyn Error>>;

fn toml_file(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = Builder::new().suffix(".toml").tempfile()?;
    write!(file, "{contents}")?;
    Ok(file)
}

fn config_error(result: Result<ConfigFile, TaskdagError>) -> String {
    match result {
        Err(TaskdagError::ConfigError(msg)) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn loads_full_toml_config() -> TestResult {
    init_tracing();
    let file = toml_file(
        r#"
[config]
max_workers = 2
log_level = "debug"
retry_delay = "250ms"
mode = "sequential"

[task.fetch]
cmd = "echo fetch"
retries = 2
timeout = "30s"
description = "Download the page"

[task.count]
cmd = "echo count"
after = ["fetch"]
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.mode(), RunMode::Sequential);
    assert_eq!(cfg.log_level(), "debug");

    let settings = cfg.settings();
    assert_eq!(settings.max_workers, 2);
    assert_eq!(settings.retry_delay, Duration::from_millis(250));

    let fetch = &cfg.task["fetch"];
    assert_eq!(fetch.retries, 2);
    assert_eq!(fetch.timeout_duration(), Some(Duration::from_secs(30)));
    assert_eq!(fetch.description.as_deref(), Some("Download the page"));
    assert_eq!(cfg.task["count"].after, vec!["fetch"]);
    Ok(())
}

#[test]
fn missing_config_section_uses_defaults() -> TestResult {
    let file = toml_file(
        r#"
[task.only]
cmd = "true"
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.mode(), RunMode::Parallel);
    assert_eq!(cfg.log_level(), "info");
    assert_eq!(cfg.settings().max_workers, 4);
    assert_eq!(cfg.settings().retry_delay, Duration::from_secs(1));
    assert_eq!(cfg.task["only"].retries, 0);
    assert!(cfg.task["only"].timeout_duration().is_none());
    Ok(())
}

#[test]
fn loads_json_by_extension() -> TestResult {
    let mut file = Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        r#"{{
  "config": {{ "max_workers": 3 }},
  "task": {{
    "a": {{ "cmd": "echo a" }},
    "b": {{ "cmd": "echo b", "after": ["a"], "retries": 1 }}
  }}
}}"#
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.settings().max_workers, 3);
    assert_eq!(cfg.task["b"].after, vec!["a"]);
    assert_eq!(cfg.task["b"].retries, 1);
    Ok(())
}

#[test]
fn cycle_is_a_config_error() -> TestResult {
    init_tracing();
    let file = toml_file(
        r#"
[task.A]
cmd = "echo A"
after = ["B"]

[task.B]
cmd = "echo B"
after = ["A"]
"#,
    )?;

    let msg = config_error(load_and_validate(file.path()));
    assert!(msg.contains("cycle"), "message: {msg}");
    Ok(())
}

#[test]
fn unknown_and_self_dependencies_are_config_errors() {
    let unknown = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").after("ghost").build())
        .build_raw();
    let msg = config_error(ConfigFile::try_from(unknown));
    assert!(msg.contains("unknown dependency 'ghost'"), "message: {msg}");

    let itself = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").after("A").build())
        .build_raw();
    let msg = config_error(ConfigFile::try_from(itself));
    assert!(msg.contains("itself"), "message: {msg}");
}

#[test]
fn global_settings_are_checked() {
    let no_tasks = ConfigFileBuilder::new().build_raw();
    assert!(config_error(ConfigFile::try_from(no_tasks)).contains("at least one"));

    let zero_workers = ConfigFileBuilder::new()
        .max_workers(0)
        .with_task("A", TaskConfigBuilder::new("true").build())
        .build_raw();
    assert!(config_error(ConfigFile::try_from(zero_workers)).contains("max_workers"));

    let bad_delay = ConfigFileBuilder::new()
        .retry_delay("soon")
        .with_task("A", TaskConfigBuilder::new("true").build())
        .build_raw();
    assert!(config_error(ConfigFile::try_from(bad_delay)).contains("retry_delay"));

    let mut bad_level = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("true").build())
        .build_raw();
    bad_level.config.log_level = "chatty".to_string();
    assert!(config_error(ConfigFile::try_from(bad_level)).contains("log_level"));
}

#[test]
fn task_fields_are_checked() {
    let bad_timeout = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("true").timeout("5 days").build())
        .build_raw();
    assert!(config_error(ConfigFile::try_from(bad_timeout)).contains("timeout"));

    let empty_cmd = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("  ").build())
        .build_raw();
    assert!(config_error(ConfigFile::try_from(empty_cmd)).contains("empty `cmd`"));
}

#[test]
fn unknown_mode_fails_to_parse() -> TestResult {
    let file = toml_file(
        r#"
[config]
mode = "sideways"

[task.A]
cmd = "true"
"#,
    )?;

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, TaskdagError::TomlError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/definitely/not/here/Taskdag.toml").unwrap_err();
    assert!(matches!(err, TaskdagError::IoError(_)));
}

#[test]
fn default_path_is_taskdag_toml() {
    assert_eq!(default_config_path().to_str(), Some("Taskdag.toml"));
}

#[test]
fn durations_accept_the_documented_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1H"), Ok(Duration::from_secs(3600)));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("s").is_err());
    assert!(parse_duration("5d").is_err());

    // Large values are rejected instead of overflowing.
    let err = parse_duration("18446744073709551615h").unwrap_err();
    assert!(err.contains("out of range"), "error: {err}");
    assert!(parse_duration("18446744073709551615m").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s"),
        Ok(Duration::from_secs(u64::MAX))
    );
}

#[test]
fn oversized_timeout_is_a_config_error() {
    let raw = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("true").timeout("99999999999999999h").build())
        .build_raw();
    assert!(config_error(ConfigFile::try_from(raw)).contains("out of range"));
}
