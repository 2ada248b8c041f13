//! Client for the Habitat supervisor HTTP API.

mod client;

pub use client::*;
