// src/exec/command.rs

//! Shell-command work items.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::exec::work::Work;
use crate::types::{TaskName, TaskValue};

/// Runs a shell command and yields its trimmed stdout as a JSON string.
///
/// A non-zero exit status fails the attempt; the error carries the exit
/// code and the last line written to stderr. Every attempt spawns a fresh
/// process.
#[derive(Debug, Clone)]
pub struct CommandWork {
    task: TaskName,
    cmd: String,
    current_dir: Option<PathBuf>,
}

impl CommandWork {
    pub fn new(task: impl Into<TaskName>, cmd: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            cmd: cmd.into(),
            current_dir: None,
        }
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    fn shell_command(&self) -> Command {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Work for CommandWork {
    fn invoke(&self) -> Result<TaskValue> {
        info!(task = %self.task, cmd = %self.cmd, "starting task process");

        let output = self
            .shell_command()
            .output()
            .with_context(|| format!("spawning process for task '{}'", self.task))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            debug!(task = %self.task, "stderr: {}", line);
        }

        let code = output.status.code().unwrap_or(-1);
        info!(
            task = %self.task,
            exit_code = code,
            success = output.status.success(),
            "task process exited"
        );

        if !output.status.success() {
            match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => bail!("command exited with code {code}: {}", last.trim()),
                None => bail!("command exited with code {code}"),
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(TaskValue::String(stdout.trim().to_string()))
    }
}
