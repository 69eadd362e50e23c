//! Command-line interface for GrantDesk operators.

pub mod config;

pub use config::{Command, Config, SourceArg};
