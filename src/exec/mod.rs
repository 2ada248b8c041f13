//! Execution of marshalled `hab` invocations.
//!
//! Three strategies are supported: direct execution with captured output,
//! execution through a shell with captured output, and spawning a live
//! process whose output can be streamed to the log or captured on demand.

mod buffered;
mod process;

pub use buffered::*;
pub use process::*;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::args::{ExecOptions, Invocation, Strategy};

/// Default ceiling for buffered stdout/stderr, in bytes.
pub const DEFAULT_MAX_BUFFER: usize = 10 * 1024 * 1024;

/// Error type for process execution.
#[derive(thiserror::Error, Debug)]
pub enum ExecError {
    /// The binary was not found.
    #[error("hab binary not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when launching.
    #[error("Permission denied launching {0}")]
    PermissionDenied(PathBuf),

    /// The process exited unsuccessfully.
    #[error("hab exited with {}: {stderr}", describe_code(.code))]
    Failed {
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Trimmed standard output.
        stdout: String,
        /// Trimmed standard error.
        stderr: String,
    },

    /// Buffered output grew past the configured ceiling.
    #[error("Output exceeded maximum buffer of {limit} bytes")]
    MaxBufferExceeded { limit: usize },

    /// A spawned process exited unsuccessfully while being waited on.
    #[error("Spawned hab process exited with {}", describe_code(.code))]
    ExitStatus { code: Option<i32> },

    /// A piped stream was not available.
    #[error("Process {0} not available")]
    MissingPipe(&'static str),

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Create an `ExecError` from a launch failure, classifying common cases.
    fn from_io(binary: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(binary.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(binary.to_path_buf()),
            _ => Self::Io(err),
        }
    }

    /// Exit code carried by the error, if any.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } | Self::ExitStatus { code } => *code,
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |c| format!("code {c}"))
}

/// Result of running an invocation, shaped by the strategy used.
#[derive(Debug)]
pub enum Execution {
    /// Trimmed standard output of a buffered run.
    Output(String),
    /// The process failed and `$nullOnError` was set.
    Null,
    /// A live spawned process.
    Spawned(HabProcess),
    /// A spawned process exited successfully after `$wait`.
    Completed,
}

impl Execution {
    /// Borrow captured output, if this is a buffered result.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Output(out) => Some(out),
            _ => None,
        }
    }

    /// Take captured output, if this is a buffered result.
    #[must_use]
    pub fn into_output(self) -> Option<String> {
        match self {
            Self::Output(out) => Some(out),
            _ => None,
        }
    }

    /// Take the process handle, if this is a spawned result.
    #[must_use]
    pub fn into_process(self) -> Option<HabProcess> {
        match self {
            Self::Spawned(process) => Some(process),
            _ => None,
        }
    }

    /// Whether a failure was converted to a null result.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Runs invocations against a fixed `hab` binary.
#[derive(Debug, Clone)]
pub struct Executor {
    binary: PathBuf,
    max_buffer: usize,
}

impl Executor {
    /// Create an executor for `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }

    /// Set the default output ceiling for buffered strategies.
    #[must_use]
    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Path of the binary this executor runs.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run a marshalled invocation.
    ///
    /// # Errors
    ///
    /// Returns `ExecError` if the process cannot be launched, exits
    /// unsuccessfully or overflows the output buffer, unless the invocation
    /// carries `$nullOnError`, in which case [`Execution::Null`] is returned.
    pub async fn run(&self, invocation: &Invocation) -> Result<Execution, ExecError> {
        tracing::debug!(
            binary = %self.binary.display(),
            args = %invocation.joined_args(),
            "Invoking hab"
        );

        let options = &invocation.options;
        let result = match options.strategy() {
            Strategy::Capture => {
                let cmd = build_command(&self.binary, &invocation.args, invocation);
                self.run_buffered(cmd, options).await
            }
            Strategy::Shell => {
                let cmd = self.shell_command(invocation);
                self.run_buffered(cmd, options).await
            }
            Strategy::Spawn => self.run_spawned(invocation).await,
        };

        match result {
            Err(err) if options.null_on_error => {
                tracing::debug!(error = %err, "hab failed, resolving with null");
                Ok(Execution::Null)
            }
            other => other,
        }
    }

    async fn run_buffered(
        &self,
        cmd: Command,
        options: &ExecOptions,
    ) -> Result<Execution, ExecError> {
        let max_buffer = options.settings.max_buffer.unwrap_or(self.max_buffer);
        let captured = capture_output(cmd, &self.binary, max_buffer).await?;
        if captured.status.success() {
            Ok(Execution::Output(captured.stdout.trim().to_string()))
        } else {
            Err(ExecError::Failed {
                code: captured.status.code(),
                stdout: captured.stdout.trim().to_string(),
                stderr: captured.stderr.trim().to_string(),
            })
        }
    }

    async fn run_spawned(&self, invocation: &Invocation) -> Result<Execution, ExecError> {
        let options = &invocation.options;
        let mut cmd = build_command(&self.binary, &invocation.args, invocation);
        let wait_only = options.wait && !options.passthrough;
        cmd.stdin(if options.wait {
            Stdio::null()
        } else {
            Stdio::piped()
        })
        .stdout(if wait_only {
            Stdio::null()
        } else {
            Stdio::piped()
        })
        .stderr(Stdio::piped())
        .kill_on_drop(options.settings.kill_on_drop.unwrap_or(false));

        let process = HabProcess::spawn(cmd, &self.binary, options.passthrough)?;

        if !options.wait {
            return Ok(Execution::Spawned(process));
        }

        let status = process.wait_drained().await?;
        if status.success() {
            Ok(Execution::Completed)
        } else {
            Err(ExecError::ExitStatus {
                code: status.code(),
            })
        }
    }

    /// Build a shell command line: the binary path is escaped, arguments
    /// are joined verbatim so shell syntax in them is honoured.
    fn shell_command(&self, invocation: &Invocation) -> Command {
        let binary = self.binary.to_string_lossy();
        let mut line = shell_escape::escape(binary).into_owned();
        if !invocation.args.is_empty() {
            line.push(' ');
            line.push_str(&invocation.joined_args());
        }

        #[cfg(unix)]
        let (shell, flag) = ("sh", "-c");
        #[cfg(not(unix))]
        let (shell, flag) = ("cmd", "/C");

        build_command(Path::new(shell), &[flag.to_string(), line], invocation)
    }
}

fn build_command(program: &Path, args: &[String], invocation: &Invocation) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    invocation.env.apply(&mut cmd);
    if let Some(cwd) = &invocation.options.settings.cwd {
        cmd.current_dir(cwd);
    }
    cmd
}
