//! Helpers for running the `dw` binary
//!
//! Every command runs with its own config home so a developer's real
//! config file never leaks into the tests.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

/// `dw` command builder
pub struct DwCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl DwCommand {
    /// Create a command run from `working_dir` with an isolated config home
    pub fn new(working_dir: impl AsRef<Path>, config_home: impl AsRef<Path>) -> Self {
        let config_home = config_home.as_ref().display().to_string();
        let mut env = HashMap::new();
        env.insert("XDG_CONFIG_HOME".to_string(), config_home.clone());
        env.insert("HOME".to_string(), config_home);
        env.insert("RUST_LOG".to_string(), "off".to_string());

        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env,
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_dw"));
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env);
        command
    }

    /// Run to completion
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();
        let output = self.command().output().context("Failed to execute dw")?;
        Ok(CommandResult::from_output(output, start.elapsed()))
    }

    /// Start in the background with piped output
    pub fn spawn(&self) -> Result<Running> {
        let child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn dw")?;
        Ok(Running {
            child,
            started: Instant::now(),
        })
    }

    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }
}

/// A `dw` process started with `DwCommand::spawn`
pub struct Running {
    child: Child,
    started: Instant,
}

impl Running {
    /// Wait for exit, killing the process if it outlives `limit`
    pub fn finish(mut self, limit: Duration) -> Result<CommandResult> {
        let deadline = self.started + limit;
        while self.child.try_wait()?.is_none() {
            if Instant::now() >= deadline {
                self.child.kill()?;
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        let output = self.child.wait_with_output().context("Failed to collect dw output")?;
        Ok(CommandResult::from_output(output, self.started.elapsed()))
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    fn from_output(output: Output, duration: Duration) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Parse stdout as JSON lines, skipping anything that is not JSON
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.stdout
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

/// Build a `DwCommand` from a working dir, config home and arguments
///
/// ```ignore
/// dw!(dir, home, "config", "--path").assert_success()?;
/// ```
#[macro_export]
macro_rules! dw {
    ($dir:expr, $home:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::DwCommand::new($dir, $home);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines_skip_noise() {
        let result = CommandResult {
            stdout: "{\"type\":\"event\"}\nnot json\n{\"type\":\"overflow\"}\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration: Duration::from_millis(10),
        };

        let lines = result.json_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "event");
        assert_eq!(lines[1]["type"], "overflow");
    }
}
