//! Parsing of `hab --version` output.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static VERSION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^hab (\S+)/(\d+)$").expect("valid version pattern"));

/// Version and build reported by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryVersion {
    /// Semantic version, e.g. `1.6.1234`.
    pub version: String,
    /// Build timestamp, e.g. `20230101000000`.
    pub build: String,
}

impl BinaryVersion {
    /// Parse a `hab <version>/<build>` line.
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let caps = VERSION_LINE.captures(output.trim())?;
        Some(Self {
            version: caps[1].to_string(),
            build: caps[2].to_string(),
        })
    }

    /// The version as a [`semver::Version`], if it is valid semver.
    #[must_use]
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }
}

impl std::fmt::Display for BinaryVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.version, self.build)
    }
}
