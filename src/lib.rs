//! hab-client - async Rust binding for the Habitat `hab` binary.
//!
//! Calls are described as an ordered list of positional tokens and option
//! maps, marshalled into a command line, and run with one of three
//! strategies: direct capture, shell capture, or spawn with optional
//! streaming to the log.

pub mod api;
pub mod args;
pub mod config;
pub mod display;
pub mod error;
pub mod exec;
pub mod hab;

pub use args::{Arg, OptionMap};
pub use error::HabError;
pub use exec::{Execution, HabProcess};
pub use hab::Hab;
