//! Positional tokens and option maps.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::MarshalError;

/// Directive: resolve with [`Execution::Null`](crate::exec::Execution::Null) instead of failing.
pub const NULL_ON_ERROR: &str = "$nullOnError";
/// Directive: spawn the binary and return a live handle.
pub const SPAWN: &str = "$spawn";
/// Directive: run the command line through a shell.
pub const SHELL: &str = "$shell";
/// Directive: extra environment variables for the child.
pub const ENV: &str = "$env";
/// Directive: whether the child inherits the caller's environment.
pub const PRESERVE_ENV: &str = "$preserveEnv";
/// Directive: platform execution settings.
pub const OPTIONS: &str = "$options";
/// Directive: stream child output to the log line by line. Implies `$spawn`.
pub const PASSTHROUGH: &str = "$passthrough";
/// Directive: resolve only once the spawned child has exited.
pub const WAIT: &str = "$wait";

/// Prefix marking an option map key as a directive.
pub const DIRECTIVE_PREFIX: char = '$';

/// A single element of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A positional value. The first token names the subcommand.
    Token(String),
    /// Flags and directives.
    Options(OptionMap),
}

impl Arg {
    /// Name of the JSON type for error messages.
    fn json_kind(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Token(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Token(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Self::Token(value.clone())
    }
}

macro_rules! impl_numeric_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Self::Token(value.to_string())
                }
            }
        )*
    };
}

impl_numeric_arg!(i32, i64, u16, u32, u64, usize, f64);

impl From<OptionMap> for Arg {
    fn from(value: OptionMap) -> Self {
        Self::Options(value)
    }
}

impl TryFrom<Value> for Arg {
    type Error = MarshalError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(Self::Token(s)),
            Value::Number(n) => Ok(Self::Token(n.to_string())),
            Value::Object(map) => Ok(Self::Options(OptionMap::from(map))),
            other => Err(MarshalError::UnsupportedArgument(Self::json_kind(&other))),
        }
    }
}

/// An ordered map of flags and directives.
///
/// Keys keep their insertion order so flags reach the command line in the
/// order the caller wrote them. Setting an existing key replaces its value in
/// place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionMap {
    entries: Vec<(String, Value)>,
}

impl OptionMap {
    /// Create an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key to an arbitrary JSON value.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Set a boolean flag.
    #[must_use]
    pub fn flag(self, key: impl Into<String>, enabled: bool) -> Self {
        self.set(key, enabled)
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Number of entries, directives included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve with a null result when the process fails.
    #[must_use]
    pub fn null_on_error(self, enabled: bool) -> Self {
        self.set(NULL_ON_ERROR, enabled)
    }

    /// Spawn the process and return a live handle.
    #[must_use]
    pub fn spawn(self, enabled: bool) -> Self {
        self.set(SPAWN, enabled)
    }

    /// Run the command line through a shell.
    #[must_use]
    pub fn shell(self, enabled: bool) -> Self {
        self.set(SHELL, enabled)
    }

    /// Stream output to the log as it is produced.
    #[must_use]
    pub fn passthrough(self, enabled: bool) -> Self {
        self.set(PASSTHROUGH, enabled)
    }

    /// Resolve only once a spawned process has exited.
    #[must_use]
    pub fn wait(self, enabled: bool) -> Self {
        self.set(WAIT, enabled)
    }

    /// Control inheritance of the caller's environment.
    #[must_use]
    pub fn preserve_env(self, enabled: bool) -> Self {
        self.set(PRESERVE_ENV, enabled)
    }

    /// Add one environment variable for the child.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = Value::String(value.into());
        match self.entries.iter_mut().find(|(k, _)| k == ENV) {
            Some((_, Value::Object(vars))) => {
                vars.insert(name, value);
            }
            Some(slot) => {
                let mut vars = Map::new();
                vars.insert(name, value);
                slot.1 = Value::Object(vars);
            }
            None => {
                let mut vars = Map::new();
                vars.insert(name, value);
                self.entries.push((ENV.to_string(), Value::Object(vars)));
            }
        }
        self
    }

    /// Set platform execution settings.
    #[must_use]
    pub fn settings(self, settings: &ExecSettings) -> Self {
        let value = serde_json::to_value(settings).unwrap_or(Value::Null);
        self.set(OPTIONS, value)
    }
}

impl From<Map<String, Value>> for OptionMap {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl From<BTreeMap<String, String>> for OptionMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Platform execution settings carried by the `$options` directive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecSettings {
    /// Working directory for the child.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Output ceiling for buffered strategies, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_buffer: Option<usize>,
    /// Kill a spawned child when its handle is dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_on_drop: Option<bool>,
}

impl ExecSettings {
    /// Overlay the fields set in `other` onto `self`.
    pub fn merge(&mut self, other: ExecSettings) {
        if other.cwd.is_some() {
            self.cwd = other.cwd;
        }
        if other.max_buffer.is_some() {
            self.max_buffer = other.max_buffer;
        }
        if other.kill_on_drop.is_some() {
            self.kill_on_drop = other.kill_on_drop;
        }
    }
}
