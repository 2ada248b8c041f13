//! The `hab` binding.
//!
//! [`Hab`] owns the configuration, the executor for the binary and the
//! supervisor API client. Every call goes through [`Hab::exec`], which
//! marshals its arguments and runs the binary with the strategy the
//! directives select.

mod status;
mod version;

pub use status::*;
pub use version::*;

use std::path::Path;

use semver::VersionReq;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::api::SupervisorApi;
use crate::args::{Arg, Invocation, OptionMap};
use crate::config::{ConfigLoader, HabConfig};
use crate::error::HabError;
use crate::exec::{Execution, Executor};

/// Handle to a `hab` binary and its supervisor.
#[derive(Debug)]
pub struct Hab {
    config: HabConfig,
    executor: Executor,
    api: SupervisorApi,
    version: OnceCell<Option<BinaryVersion>>,
}

impl Hab {
    /// Create a binding from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `HabError::Api` if the supervisor API URL is invalid.
    pub fn new(config: HabConfig) -> Result<Self, HabError> {
        let api = SupervisorApi::new(&config.api_base_url)?;
        let executor = Executor::new(config.binary.clone()).with_max_buffer(config.max_buffer);
        Ok(Self {
            config,
            executor,
            api,
            version: OnceCell::new(),
        })
    }

    /// Create a binding from the first config file found, or defaults.
    ///
    /// # Errors
    ///
    /// Returns `HabError::Config` if a config file cannot be parsed, or any
    /// error from [`Hab::new`].
    pub fn from_config_files() -> Result<Self, HabError> {
        Self::new(ConfigLoader::new().load()?)
    }

    /// The configuration this binding was built with.
    #[must_use]
    pub fn configuration(&self) -> &HabConfig {
        &self.config
    }

    /// Path of the binary.
    #[must_use]
    pub fn binary(&self) -> &Path {
        self.executor.binary()
    }

    /// The supervisor API client.
    #[must_use]
    pub fn api(&self) -> &SupervisorApi {
        &self.api
    }

    /// Marshal and run a call.
    ///
    /// The first positional token names the subcommand; further tokens and
    /// option-map flags follow in encounter order.
    ///
    /// # Errors
    ///
    /// Returns `HabError::Marshal` for malformed arguments and
    /// `HabError::Exec` when the process fails without `$nullOnError`.
    pub async fn exec<I, A>(&self, args: I) -> Result<Execution, HabError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let invocation = Invocation::marshal(args)?;
        self.run(&invocation).await
    }

    /// Marshal and run a call given as JSON values.
    ///
    /// # Errors
    ///
    /// Returns `HabError::Marshal` if a value is not a string, number or
    /// object, and otherwise as [`Hab::exec`].
    pub async fn exec_json<I>(&self, values: I) -> Result<Execution, HabError>
    where
        I: IntoIterator<Item = Value>,
    {
        let invocation = Invocation::from_json(values)?;
        self.run(&invocation).await
    }

    /// Run an already marshalled invocation.
    ///
    /// # Errors
    ///
    /// Returns `HabError::Exec` when the process fails without `$nullOnError`.
    pub async fn run(&self, invocation: &Invocation) -> Result<Execution, HabError> {
        Ok(self.executor.run(invocation).await?)
    }

    /// Version reported by the binary, queried once and cached.
    ///
    /// Returns `None` if the binary could not be run or its output did not
    /// match `hab <version>/<build>`; that outcome is cached too.
    pub async fn version(&self) -> Option<&BinaryVersion> {
        self.version
            .get_or_init(|| self.query_version())
            .await
            .as_ref()
    }

    async fn query_version(&self) -> Option<BinaryVersion> {
        match self.exec([OptionMap::new().flag("version", true)]).await {
            Ok(Execution::Output(output)) => {
                let parsed = BinaryVersion::parse(&output);
                if parsed.is_none() {
                    tracing::warn!(output = %output, "Unrecognized hab version output");
                }
                parsed
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to query hab version");
                None
            }
        }
    }

    /// Whether the binary's version satisfies a semver range.
    ///
    /// An unavailable version satisfies no range.
    ///
    /// # Errors
    ///
    /// Returns `HabError::InvalidVersionRange` if `range` does not parse.
    pub async fn satisfies(&self, range: &str) -> Result<bool, HabError> {
        let req = VersionReq::parse(range).map_err(|source| HabError::InvalidVersionRange {
            range: range.to_string(),
            source,
        })?;
        let version = self.version().await.and_then(BinaryVersion::semver);
        Ok(version.is_some_and(|v| req.matches(&v)))
    }

    /// Fail unless the binary's version satisfies `range`.
    ///
    /// # Errors
    ///
    /// Returns `HabError::VersionRequirement` naming the range and the
    /// reported version, or `HabError::InvalidVersionRange`.
    pub async fn require_version(&self, range: &str) -> Result<&Self, HabError> {
        if self.satisfies(range).await? {
            return Ok(self);
        }
        Err(HabError::VersionRequirement {
            required: range.to_string(),
            found: self.version().await.map(|v| v.version.clone()),
        })
    }

    /// Status of services loaded in the supervisor, from `hab svc status`.
    ///
    /// Returns `None` if the command fails.
    pub async fn status(&self) -> Option<Vec<ServiceStatus>> {
        let args = [Arg::from("status"), OptionMap::new().null_on_error(true).into()];
        match self.svc(args).await {
            Ok(Execution::Output(output)) => Some(parse_status(&output)),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to query service status");
                None
            }
        }
    }

    /// Services listed by the supervisor HTTP API.
    ///
    /// # Errors
    ///
    /// Returns `HabError::Api` if the request fails.
    pub async fn get_services(&self) -> Result<Value, HabError> {
        Ok(self.api.services().await?)
    }
}

macro_rules! subcommands {
    ($($name:ident => $command:literal),* $(,)?) => {
        /// Subcommands with a convenience method on [`Hab`].
        pub const SUBCOMMANDS: &[&str] = &[$($command),*];

        impl Hab {
            $(
                #[doc = concat!("Run `hab ", $command, "` with the given arguments.")]
                #[doc = ""]
                #[doc = "# Errors"]
                #[doc = ""]
                #[doc = "See [`Hab::exec`]."]
                pub async fn $name<I, A>(&self, args: I) -> Result<Execution, HabError>
                where
                    I: IntoIterator<Item = A>,
                    A: Into<Arg>,
                {
                    let args = std::iter::once(Arg::from($command))
                        .chain(args.into_iter().map(Into::into));
                    self.exec(args).await
                }
            )*
        }
    };
}

subcommands! {
    bldr => "bldr",
    cli => "cli",
    config => "config",
    file => "file",
    license => "license",
    origin => "origin",
    pkg => "pkg",
    plan => "plan",
    ring => "ring",
    setup => "setup",
    studio => "studio",
    sup => "sup",
    svc => "svc",
    user => "user",
}
