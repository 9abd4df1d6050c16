use anyhow::{Context, Result};
use std::process::{Command, Output};
use tracing::{debug, trace};

/// A command exited unsuccessfully. Carries enough to tell the operator what ran.
#[derive(Debug, thiserror::Error)]
#[error("Command failed (exit code {}): {command} {}\n{stderr}", .status.unwrap_or(-1), .args.join(" "))]
pub struct CommandFailed {
    pub command: String,
    pub args: Vec<String>,
    pub status: Option<i32>,
    pub stderr: String,
}

/// A builder for executing external programs with unified error handling
pub struct Cmd {
    command: String,
    args: Vec<String>,
}

impl Cmd {
    /// Create a new command builder
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Add a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn spawn_output(&self) -> Result<Output> {
        Command::new(&self.command)
            .args(&self.args)
            .output()
            .with_context(|| {
                format!(
                    "Failed to execute command: {} {}",
                    self.command,
                    self.args.join(" ")
                )
            })
    }

    /// Execute the command and return the output.
    /// Returns a [`CommandFailed`] error if the command exits non-zero.
    pub fn run(self) -> Result<Output> {
        trace!(command = %self.command, args = ?self.args, "cmd:run start");

        let output = self.spawn_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(
                command = %self.command,
                args = ?self.args,
                status = ?output.status.code(),
                stderr = %stderr,
                "cmd:run failure"
            );
            return Err(CommandFailed {
                command: self.command,
                args: self.args,
                status: output.status.code(),
                stderr,
            }
            .into());
        }
        trace!(command = %self.command, "cmd:run success");
        Ok(output)
    }

    /// Execute the command and return stdout as a trimmed string
    pub fn run_and_capture_stdout(self) -> Result<String> {
        let output = self.run()?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    /// Execute the command, returning Ok(true) if it succeeds, Ok(false) if it fails.
    /// Only a failure to spawn the program at all is an error.
    pub fn run_as_check(self) -> Result<bool> {
        trace!(command = %self.command, args = ?self.args, "cmd:check start");

        let output = self.spawn_output()?;

        let success = output.status.success();
        trace!(command = %self.command, success, "cmd:check result");
        Ok(success)
    }
}
