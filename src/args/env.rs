//! Child process environment.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::process::Command;

/// Capture the caller's environment, skipping variables that are not UTF-8.
fn snapshot() -> Arc<BTreeMap<String, String>> {
    Arc::new(
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect(),
    )
}

/// Environment for a `hab` child process.
///
/// Lookups check the overlay first and then the snapshot of the caller's
/// environment taken when the invocation was marshalled. The caller's
/// environment is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnv {
    overlay: BTreeMap<String, String>,
    ambient: Option<Arc<BTreeMap<String, String>>>,
}

impl CommandEnv {
    /// An environment that inherits the caller's variables.
    #[must_use]
    pub fn inherited() -> Self {
        Self {
            overlay: BTreeMap::new(),
            ambient: Some(snapshot()),
        }
    }

    /// An environment containing only the overlay.
    #[must_use]
    pub fn isolated() -> Self {
        Self::default()
    }

    /// Whether the caller's environment is inherited.
    #[must_use]
    pub fn inherits(&self) -> bool {
        self.ambient.is_some()
    }

    /// Set an overlay variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.overlay.insert(name.into(), value.into());
    }

    /// Look up a variable, overlay first.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.overlay
            .get(name)
            .or_else(|| self.ambient.as_ref().and_then(|vars| vars.get(name)))
            .map(String::as_str)
    }

    /// Variables set explicitly for this invocation.
    #[must_use]
    pub fn overlay(&self) -> &BTreeMap<String, String> {
        &self.overlay
    }

    /// Switch inheritance on or off, keeping the overlay.
    pub fn set_inherit(&mut self, inherit: bool) {
        match (inherit, self.ambient.is_some()) {
            (true, false) => self.ambient = Some(snapshot()),
            (false, true) => self.ambient = None,
            _ => {}
        }
    }

    /// Configure `cmd` to run with this environment.
    pub fn apply(&self, cmd: &mut Command) {
        if self.ambient.is_none() {
            cmd.env_clear();
        }
        cmd.envs(&self.overlay);
    }
}
