#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use taskdag::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use taskdag::engine::OrchestratorSettings;
use taskdag::types::RunMode;

/// Retry pause used by tests so retried tasks don't slow the suite down.
pub const FAST_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Settings with a tiny retry delay and the given pool size.
pub fn fast_settings(max_workers: usize) -> OrchestratorSettings {
    OrchestratorSettings::default()
        .with_max_workers(max_workers)
        .with_retry_delay(FAST_RETRY_DELAY)
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection {
                    retry_delay: "5ms".to_string(),
                    ..ConfigSection::default()
                },
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.config.max_workers = n;
        self
    }

    pub fn retry_delay(mut self, delay: &str) -> Self {
        self.config.config.retry_delay = delay.to_string();
        self
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.config.config.mode = mode;
        self
    }

    /// The unvalidated config, for tests that exercise validation itself.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                after: vec![],
                retries: 0,
                timeout: None,
                description: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn retries(mut self, n: u32) -> Self {
        self.task.retries = n;
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.task.timeout = Some(timeout.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.task.description = Some(description.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
