//! Execute-and-capture with a bounded output buffer.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::ExecError;

/// Output of a completed buffered run.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Exit status of the child.
    pub status: ExitStatus,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// Each stream is bounded by `max_buffer` bytes. When either overflows the
/// child is killed and `ExecError::MaxBufferExceeded` is returned.
///
/// # Errors
///
/// Returns `ExecError` if the process fails to launch, a stream overflows,
/// or reading from the child fails.
pub async fn capture_output(
    mut cmd: Command,
    binary: &Path,
    max_buffer: usize,
) -> Result<CapturedOutput, ExecError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| ExecError::from_io(binary, e))?;
    let stdout = child.stdout.take().ok_or(ExecError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(ExecError::MissingPipe("stderr"))?;

    // Dropping `child` on overflow kills it.
    let (stdout, stderr) = tokio::try_join!(
        read_bounded(stdout, max_buffer),
        read_bounded(stderr, max_buffer)
    )?;
    let status = child.wait().await?;

    Ok(CapturedOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

async fn read_bounded<R>(reader: R, limit: usize) -> Result<Vec<u8>, ExecError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let ceiling = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    reader.take(ceiling).read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(ExecError::MaxBufferExceeded { limit });
    }
    Ok(buf)
}
