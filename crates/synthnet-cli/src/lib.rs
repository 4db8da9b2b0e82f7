//! Library side of the `synthnet` binary
//!
//! Exposes the command tree so it can be driven from tests or embedded in
//! other tools.

pub mod commands;
pub mod config;
pub mod error;
pub mod progress;

pub use commands::SynthnetCli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
