// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::OrchestratorSettings;
use crate::types::RunMode;

/// Configuration exactly as read from disk, before validation.
///
/// ```toml
/// [config]
/// max_workers = 4
/// retry_delay = "1s"
///
/// [task.fetch]
/// cmd = "curl -sSf https://example.com -o page.html"
/// retries = 2
///
/// [task.count]
/// cmd = "wc -c < page.html"
/// after = ["fetch"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }

    /// Orchestrator settings derived from `[config]`.
    pub fn settings(&self) -> OrchestratorSettings {
        let mut settings =
            OrchestratorSettings::default().with_max_workers(self.config.max_workers);
        if let Ok(delay) = parse_duration(&self.config.retry_delay) {
            settings = settings.with_retry_delay(delay);
        }
        settings
    }

    pub fn mode(&self) -> RunMode {
        self.config.mode
    }

    pub fn log_level(&self) -> &str {
        &self.config.log_level
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSection {
    /// Worker pool size for parallel runs.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Pause between attempts, e.g. `"500ms"` or `"1s"`.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,

    #[serde(default)]
    pub mode: RunMode,
}

fn default_max_workers() -> usize {
    crate::engine::DEFAULT_MAX_WORKERS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retry_delay() -> String {
    "1s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            log_level: default_log_level(),
            retry_delay: default_retry_delay(),
            mode: RunMode::default(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Shell command to run.
    pub cmd: String,

    /// Tasks that must complete first.
    #[serde(default)]
    pub after: Vec<String>,

    /// Extra attempts after the first failure.
    #[serde(default)]
    pub retries: u32,

    /// Advisory duration; overrunning it is logged, never enforced.
    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl TaskConfig {
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.as_deref().and_then(|s| parse_duration(s).ok())
    }
}

/// Parse durations like `"250ms"`, `"3s"`, `"2m"`, `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' out of range"))
}

