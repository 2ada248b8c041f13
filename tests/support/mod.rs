//! Fake `hab` binaries for integration tests.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tracing::subscriber::DefaultGuard;

/// A shell script standing in for the `hab` binary.
pub struct FakeHab {
    dir: TempDir,
    path: PathBuf,
}

impl FakeHab {
    /// Write an executable `hab` script with the given body.
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hab");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        Self { dir, path }
    }

    /// Script that echoes its arguments.
    pub fn echo_args() -> Self {
        Self::new(r#"echo "$@""#)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Number of lines the script appended to `calls` in its directory.
    pub fn call_count(&self) -> usize {
        std::fs::read_to_string(self.dir().join("calls"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }
}

/// In-memory sink for `tracing` output, installed as the thread's default
/// subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Install a subscriber writing every level into this sink. Events are
    /// recorded until the guard is dropped.
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Recorded lines at `level` (`"INFO"`, `"ERROR"`, ...).
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned();
        text.lines()
            .filter(|line| line.trim_start().starts_with(level))
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
