//! Conversion of call arguments into an argument vector and execution options.

use serde_json::Value;

use super::{
    Arg, CommandEnv, ExecSettings, OptionMap, DIRECTIVE_PREFIX, ENV, NULL_ON_ERROR, OPTIONS,
    PASSTHROUGH, PRESERVE_ENV, SHELL, SPAWN, WAIT,
};

/// Errors raised while marshalling call arguments.
#[derive(thiserror::Error, Debug)]
pub enum MarshalError {
    /// A call argument was neither a string, a number nor an option map.
    #[error("Unsupported argument type: {0}")]
    UnsupportedArgument(&'static str),

    /// A directive carried a value of the wrong shape.
    #[error("Directive {key} expects {expected}")]
    InvalidDirective {
        key: String,
        expected: &'static str,
    },

    /// A `$`-prefixed key that is not a known directive.
    #[error("Unknown directive: {0}")]
    UnknownDirective(String),

    /// A flag value that cannot be rendered on a command line.
    #[error("Flag {key} cannot take a value of type {kind}")]
    InvalidFlagValue { key: String, kind: &'static str },
}

/// How the executor runs the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Execute directly and capture output.
    Capture,
    /// Execute through a shell and capture output.
    Shell,
    /// Spawn and hand back a live process handle.
    Spawn,
}

/// Execution options collected from directives.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExecOptions {
    /// Resolve with a null result instead of failing.
    pub null_on_error: bool,
    /// Spawn the binary.
    pub spawn: bool,
    /// Run through a shell.
    pub shell: bool,
    /// Inherit the caller's environment.
    pub preserve_env: bool,
    /// Forward output lines to the log.
    pub passthrough: bool,
    /// Resolve when the spawned process exits.
    pub wait: bool,
    /// Platform execution settings.
    pub settings: ExecSettings,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            null_on_error: false,
            spawn: false,
            shell: false,
            preserve_env: true,
            passthrough: false,
            wait: false,
            settings: ExecSettings::default(),
        }
    }
}

impl ExecOptions {
    /// The strategy these options select.
    ///
    /// Pass-through implies spawning, and spawning wins over the shell.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        if self.spawn || self.passthrough {
            Strategy::Spawn
        } else if self.shell {
            Strategy::Shell
        } else {
            Strategy::Capture
        }
    }
}

/// A fully marshalled `hab` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// The subcommand, if any positional token was supplied.
    pub command: Option<String>,
    /// Arguments passed to the binary, subcommand first.
    pub args: Vec<String>,
    /// Child environment.
    pub env: CommandEnv,
    /// Execution options.
    pub options: ExecOptions,
}

impl Invocation {
    /// Marshal an ordered list of call arguments.
    ///
    /// # Errors
    ///
    /// Returns `MarshalError` if a directive or flag value is malformed.
    pub fn marshal<I, A>(args: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let mut command = None;
        let mut positional = Vec::new();
        let mut env = CommandEnv::isolated();
        let mut options = ExecOptions::default();

        for arg in args {
            match arg.into() {
                Arg::Token(token) => {
                    if command.is_none() {
                        command = Some(token);
                    } else {
                        positional.push(token);
                    }
                }
                Arg::Options(map) => {
                    apply_option_map(&map, &mut positional, &mut env, &mut options)?;
                }
            }
        }

        env.set_inherit(options.preserve_env);

        let mut args = Vec::with_capacity(positional.len() + 1);
        if let Some(command) = &command {
            args.push(command.clone());
        }
        args.extend(positional);

        Ok(Self {
            command,
            args,
            env,
            options,
        })
    }

    /// Marshal JSON call arguments.
    ///
    /// # Errors
    ///
    /// Returns `MarshalError::UnsupportedArgument` for values that are not
    /// strings, numbers or objects, and any error from [`Invocation::marshal`].
    pub fn from_json<I>(values: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = Value>,
    {
        let args = values
            .into_iter()
            .map(Arg::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::marshal(args)
    }

    /// Arguments joined with spaces, for logging and shell execution.
    #[must_use]
    pub fn joined_args(&self) -> String {
        self.args.join(" ")
    }
}

/// Strip directives from `map` into `options`/`env` and push the remaining
/// keys as flags.
fn apply_option_map(
    map: &OptionMap,
    args: &mut Vec<String>,
    env: &mut CommandEnv,
    options: &mut ExecOptions,
) -> Result<(), MarshalError> {
    for (key, value) in map.iter() {
        if key.starts_with(DIRECTIVE_PREFIX) {
            apply_directive(key, value, env, options)?;
        } else {
            push_flag(key, value, args)?;
        }
    }
    Ok(())
}

fn apply_directive(
    key: &str,
    value: &Value,
    env: &mut CommandEnv,
    options: &mut ExecOptions,
) -> Result<(), MarshalError> {
    match key {
        NULL_ON_ERROR => options.null_on_error |= expect_bool(key, value)?,
        SPAWN => options.spawn |= expect_bool(key, value)?,
        SHELL => options.shell |= expect_bool(key, value)?,
        PASSTHROUGH => options.passthrough |= expect_bool(key, value)?,
        WAIT => options.wait |= expect_bool(key, value)?,
        PRESERVE_ENV => options.preserve_env = expect_bool(key, value)?,
        ENV => {
            let Value::Object(vars) = value else {
                return Err(invalid(key, "an object"));
            };
            for (name, value) in vars {
                let value = scalar_string(value).ok_or_else(|| invalid(key, "scalar values"))?;
                env.set(name.clone(), value);
            }
        }
        OPTIONS => {
            let settings: ExecSettings = serde_json::from_value(value.clone())
                .map_err(|_| invalid(key, "an execution settings object"))?;
            options.settings.merge(settings);
        }
        other => return Err(MarshalError::UnknownDirective(other.to_string())),
    }
    Ok(())
}

fn push_flag(key: &str, value: &Value, args: &mut Vec<String>) -> Result<(), MarshalError> {
    let flag = flag_name(key);
    match value {
        Value::Bool(true) => args.push(flag),
        Value::Bool(false) | Value::Null => {}
        Value::String(_) | Value::Number(_) => {
            args.push(flag);
            args.extend(scalar_string(value));
        }
        Value::Array(items) => {
            for item in items {
                let item = scalar_string(item).ok_or_else(|| MarshalError::InvalidFlagValue {
                    key: key.to_string(),
                    kind: "nested array or object",
                })?;
                args.push(flag.clone());
                args.push(item);
            }
        }
        Value::Object(_) => {
            return Err(MarshalError::InvalidFlagValue {
                key: key.to_string(),
                kind: "object",
            })
        }
    }
    Ok(())
}

/// `-x` for single-character keys, `--xyz` otherwise.
fn flag_name(key: &str) -> String {
    if key.chars().count() == 1 {
        format!("-{key}")
    } else {
        format!("--{key}")
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, MarshalError> {
    value.as_bool().ok_or_else(|| invalid(key, "a boolean"))
}

fn invalid(key: &str, expected: &'static str) -> MarshalError {
    MarshalError::InvalidDirective {
        key: key.to_string(),
        expected,
    }
}
