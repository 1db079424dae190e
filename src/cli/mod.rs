//! Command-line interface for hackforge.
//!
//! Provides commands for listing blueprints, generating single machines,
//! campaigns and full sweeps, and checking discovery.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
