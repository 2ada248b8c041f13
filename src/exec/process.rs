//! Spawned `hab` processes.
//!
//! A [`HabProcess`] is returned by the spawn strategy. Its output can be
//! streamed to the log as it is produced and captured on demand. Capture is
//! memoized: every caller receives the result of the first capture.

use std::borrow::Cow;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;

use super::ExecError;

/// Failure of an on-demand capture.
///
/// Carries whatever output was collected before the failure so callers can
/// report partial progress.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct CaptureError {
    /// Standard output collected before the failure.
    pub output: String,
    /// Exit code, if the process exited.
    pub code: Option<i32>,
    /// Human-readable cause.
    pub reason: String,
}

impl CaptureError {
    fn io(output: String, err: &std::io::Error) -> Self {
        Self {
            output,
            code: None,
            reason: format!("I/O error while capturing output: {err}"),
        }
    }

    fn exited(output: String, code: Option<i32>) -> Self {
        let reason = match code {
            Some(code) => format!("hab exited with code {code}"),
            None => "hab terminated by signal".to_string(),
        };
        Self {
            output,
            code,
            reason,
        }
    }
}

/// Where captured stdout comes from.
#[derive(Debug)]
enum StdoutSource {
    /// Raw pipe, read in full at capture time.
    Pipe(ChildStdout),
    /// Pass-through pump that logs each line and accumulates the text.
    Pump(JoinHandle<Result<String, CaptureError>>),
}

/// A running `hab` process.
#[derive(Debug)]
pub struct HabProcess {
    pid: Option<u32>,
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    stdout: Mutex<Option<StdoutSource>>,
    stderr: Mutex<Option<JoinHandle<()>>>,
    status: OnceLock<ExitStatus>,
    capture: OnceCell<Result<String, CaptureError>>,
}

impl HabProcess {
    /// Spawn a configured command.
    ///
    /// With `passthrough`, every stdout line is logged at info level and every
    /// stderr line at error level. Otherwise stderr lines are logged at debug
    /// level so the pipe never fills.
    ///
    /// # Errors
    ///
    /// Returns `ExecError` if the process fails to spawn.
    pub fn spawn(mut cmd: Command, binary: &Path, passthrough: bool) -> Result<Self, ExecError> {
        let mut child = cmd.spawn().map_err(|e| ExecError::from_io(binary, e))?;
        let pid = child.id();

        let stdout = child.stdout.take().map(|out| {
            if passthrough {
                StdoutSource::Pump(tokio::spawn(pump_stdout(out)))
            } else {
                StdoutSource::Pipe(out)
            }
        });
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(drain_stderr(err, passthrough)));

        tracing::debug!(pid = ?pid, passthrough, "Spawned hab process");

        Ok(Self {
            pid,
            stdin: Mutex::new(child.stdin.take()),
            child: Mutex::new(child),
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
            status: OnceLock::new(),
            capture: OnceCell::new(),
        })
    }

    /// Get the process ID captured at spawn time.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Exit status, once the process has been waited on.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status.get().copied()
    }

    /// Capture the full standard output of the process.
    ///
    /// The first call writes `input` (if any) to stdin, closes stdin, reads
    /// stdout to the end and waits for exit. Later calls, concurrent or not,
    /// return the same result and ignore their `input`.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` with the partial output and exit code if the
    /// process exits unsuccessfully or its output cannot be read.
    pub async fn capture(&self, input: Option<&str>) -> Result<String, CaptureError> {
        self.capture
            .get_or_init(|| self.run_capture(input.map(str::to_owned)))
            .await
            .clone()
    }

    /// Like [`HabProcess::capture`], with surrounding whitespace trimmed.
    ///
    /// # Errors
    ///
    /// See [`HabProcess::capture`].
    pub async fn capture_trimmed(&self, input: Option<&str>) -> Result<String, CaptureError> {
        self.capture(input).await.map(|out| out.trim().to_string())
    }

    async fn run_capture(&self, input: Option<String>) -> Result<String, CaptureError> {
        if let Some(mut stdin) = self.stdin.lock().await.take() {
            if let Some(input) = input {
                stdin
                    .write_all(input.as_bytes())
                    .await
                    .map_err(|e| CaptureError::io(String::new(), &e))?;
            }
            stdin
                .shutdown()
                .await
                .map_err(|e| CaptureError::io(String::new(), &e))?;
        }

        let source = self.stdout.lock().await.take();
        let output = match source {
            Some(StdoutSource::Pipe(mut out)) => {
                let mut buf = Vec::new();
                if let Err(e) = out.read_to_end(&mut buf).await {
                    return Err(CaptureError::io(
                        String::from_utf8_lossy(&buf).into_owned(),
                        &e,
                    ));
                }
                String::from_utf8_lossy(&buf).into_owned()
            }
            Some(StdoutSource::Pump(handle)) => match handle.await {
                Ok(result) => result?,
                Err(e) => {
                    return Err(CaptureError {
                        output: String::new(),
                        code: None,
                        reason: format!("Output pump failed: {e}"),
                    })
                }
            },
            None => String::new(),
        };

        let status = self
            .wait()
            .await
            .map_err(|e| CaptureError::io(output.clone(), &e))?;
        if status.success() {
            Ok(output)
        } else {
            Err(CaptureError::exited(output, status.code()))
        }
    }

    /// Wait for the process to exit. Closes stdin first.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.exit_status() {
            return Ok(status);
        }
        drop(self.stdin.lock().await.take());
        let status = self.child.lock().await.wait().await?;
        let _ = self.status.set(status);
        Ok(status)
    }

    /// Wait for exit, then for both output streams to reach end of file so
    /// every line has been logged.
    ///
    /// The pass-through output is consumed, so a later capture returns an
    /// empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait_drained(&self) -> std::io::Result<ExitStatus> {
        let status = self.wait().await?;
        if let Some(StdoutSource::Pump(handle)) = self.stdout.lock().await.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.stderr.lock().await.take() {
            let _ = handle.await;
        }
        Ok(status)
    }

    /// Forcefully kill the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&self) -> std::io::Result<()> {
        if self.exit_status().is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            self.signal(nix::sys::signal::Signal::SIGKILL)
        }

        #[cfg(not(unix))]
        {
            self.child.lock().await.start_kill()
        }
    }

    /// Attempt graceful termination with a timeout.
    ///
    /// On Unix, sends SIGTERM first, then SIGKILL after the timeout.
    /// On other platforms, falls back to immediate kill.
    ///
    /// # Errors
    ///
    /// Returns an error if termination fails.
    pub async fn graceful_terminate(&self, timeout: Duration) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            if self.exit_status().is_some() {
                return Ok(());
            }
            self.signal(nix::sys::signal::Signal::SIGTERM)?;

            match tokio::time::timeout(timeout, self.wait()).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(_) => {
                    // Timeout elapsed, force kill
                    self.kill().await
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = timeout;
            self.kill().await
        }
    }

    #[cfg(unix)]
    fn signal(&self, signal: nix::sys::signal::Signal) -> std::io::Result<()> {
        use nix::sys::signal::kill;

        let Some(pid) = self.pid else {
            return Ok(());
        };
        match kill(signal_target(pid)?, signal) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(errno) => Err(std::io::Error::from(errno)),
        }
    }
}

#[cfg(unix)]
fn signal_target(pid: u32) -> std::io::Result<nix::unistd::Pid> {
    let raw = i32::try_from(pid).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("pid {pid} does not fit a signal target"),
        )
    })?;
    Ok(nix::unistd::Pid::from_raw(raw))
}

async fn pump_stdout(stdout: ChildStdout) -> Result<String, CaptureError> {
    let mut reader = BufReader::new(stdout);
    let mut output = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => return Ok(String::from_utf8_lossy(&output).into_owned()),
            Ok(_) => {
                tracing::info!(target: "hab", "{}", log_line(&line));
                output.extend_from_slice(&line);
            }
            Err(e) => {
                return Err(CaptureError::io(
                    String::from_utf8_lossy(&output).into_owned(),
                    &e,
                ))
            }
        }
    }
}

async fn drain_stderr(stderr: ChildStderr, passthrough: bool) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) if passthrough => tracing::error!(target: "hab", "{}", log_line(&line)),
            Ok(_) => tracing::debug!(target: "hab", stderr = %log_line(&line), "hab stderr"),
        }
    }
}

/// A raw output line without its terminator, lossily decoded.
fn log_line(line: &[u8]) -> Cow<'_, str> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line)
}
