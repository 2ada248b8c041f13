//! Argument marshalling for `hab` invocations.
//!
//! Callers describe an invocation as an ordered list of [`Arg`]s: positional
//! tokens (the first of which names the subcommand) and option maps. Option
//! map keys prefixed with `$` are directives that configure how the binary is
//! executed; every other key becomes a command-line flag.

mod env;
mod marshal;
mod options;

pub use env::*;
pub use marshal::*;
pub use options::*;
