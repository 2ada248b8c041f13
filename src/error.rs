//! Crate-level error type.

use crate::api::ApiError;
use crate::args::MarshalError;
use crate::config::ConfigError;
use crate::exec::{CaptureError, ExecError};

/// Errors returned by [`Hab`](crate::hab::Hab) operations.
#[derive(thiserror::Error, Debug)]
pub enum HabError {
    /// Call arguments could not be marshalled.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// The binary could not be run or failed.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Capturing output from a spawned process failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// A supervisor API request failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A version range expression did not parse.
    #[error("Invalid version range {range:?}: {source}")]
    InvalidVersionRange {
        range: String,
        source: semver::Error,
    },

    /// The installed binary does not satisfy a required version range.
    #[error(
        "hab version {required} is required, but the reported version is {}",
        .found.as_deref().unwrap_or("unavailable")
    )]
    VersionRequirement {
        /// The range that was required.
        required: String,
        /// The version the binary reported, if any.
        found: Option<String>,
    },
}
