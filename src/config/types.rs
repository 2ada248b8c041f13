//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::exec::DEFAULT_MAX_BUFFER;

/// Name of the binary looked up on `PATH` when none is configured.
pub const DEFAULT_BINARY_NAME: &str = "hab";

/// Default supervisor HTTP gateway.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:9631";

/// Environment variable overriding the binary path.
pub const BINARY_ENV: &str = "HAB_CLIENT_BINARY";

/// Environment variable overriding the supervisor API base URL.
pub const API_URL_ENV: &str = "HAB_CLIENT_API_URL";

/// Configuration for a [`Hab`](crate::hab::Hab) instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabConfig {
    /// Path to the `hab` binary.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Base URL of the supervisor HTTP API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Output ceiling for buffered executions, in bytes.
    #[serde(default = "default_max_buffer")]
    pub max_buffer: usize,
}

/// Resolve `hab` through `PATH`, falling back to the bare name.
fn default_binary() -> PathBuf {
    which::which(DEFAULT_BINARY_NAME).unwrap_or_else(|_| PathBuf::from(DEFAULT_BINARY_NAME))
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_max_buffer() -> usize {
    DEFAULT_MAX_BUFFER
}

impl Default for HabConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            api_base_url: default_api_base_url(),
            max_buffer: default_max_buffer(),
        }
    }
}

impl HabConfig {
    /// Configuration for a specific binary, other fields defaulted.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            api_base_url: default_api_base_url(),
            max_buffer: default_max_buffer(),
        }
    }

    /// Set the supervisor API base URL.
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the buffered output ceiling.
    #[must_use]
    pub fn max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(binary) = lookup(BINARY_ENV).filter(|v| !v.is_empty()) {
            self.binary = PathBuf::from(binary);
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        self
    }
}
