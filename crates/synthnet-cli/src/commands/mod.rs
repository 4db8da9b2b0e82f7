//! CLI command implementations for synthnet

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use synthnet_storage::SqliteStore;
use tracing::debug;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

pub mod connect;
pub mod device;
pub mod disconnect;
pub mod groups;
pub mod import;
pub mod init;
pub mod layer;
pub mod types;

/// synthnet - synthesize synaptic connections between lattice neuron groups
#[derive(Parser, Debug)]
#[command(
    name = "synthnet",
    version,
    about = "Synthesize synaptic connections between lattice neuron groups",
    long_about = "synthnet creates rectangular neuron layers in a SQLite network store and \
                  wires them together with center/surround, cortex, topographic, random and \
                  device adapter topologies. Dense weight matrices can be imported directly."
)]
pub struct SynthnetCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Network store file (defaults to the configured store, then ./network.db)
    #[arg(short, long = "db", global = true, env = "SYNTHNET_DB")]
    pub database: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a network store and register the standard synapse types
    Init(init::InitCommand),

    /// Add a rectangular neuron layer
    Layer(layer::LayerCommand),

    /// Wire one layer to another
    Connect(connect::ConnectCommand),

    /// Remove connection groups
    Disconnect(disconnect::DisconnectCommand),

    /// Build a layer and its connections from a weight matrix
    #[command(name = "import-matrix", alias = "import")]
    ImportMatrix(import::ImportCommand),

    /// List connection groups
    #[command(alias = "ls")]
    Groups(groups::GroupsCommand),

    /// List connection types and their default parameters
    Types(types::TypesCommand),

    /// Register a device component and its receptors
    Device(device::DeviceCommand),
}

/// Resolved configuration and store location shared by every command
#[derive(Debug, Clone)]
pub struct Session {
    /// Effective configuration
    pub config: CliConfig,
    /// Network store file
    pub database: PathBuf,
}

impl Session {
    /// Open an existing store
    pub fn open_store(&self) -> CliResult<SqliteStore> {
        if !self.database.exists() {
            return Err(CliError::missing_resource(format!(
                "network store {} does not exist; run `synthnet init` first",
                self.database.display()
            )));
        }
        debug!("Opening network store {}", self.database.display());
        Ok(SqliteStore::open(&self.database)?)
    }

    /// Open the store, creating the file when needed
    pub fn create_store(&self) -> CliResult<SqliteStore> {
        if let Some(parent) = self.database.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(SqliteStore::open(&self.database)?)
    }
}

impl SynthnetCli {
    /// Log level used when RUST_LOG is unset
    pub fn default_log_level(&self) -> String {
        if self.verbose {
            return "debug".to_string();
        }
        CliConfig::resolve(self.config.as_deref())
            .ok()
            .and_then(|config| config.log_level)
            .unwrap_or_else(|| "info".to_string())
    }

    /// Execute the CLI command
    pub async fn execute(self) -> CliResult<()> {
        let config = CliConfig::resolve(self.config.as_deref())?;
        let database = config.database_path(self.database.as_deref());
        let session = Session { config, database };

        match self.command {
            Commands::Init(cmd) => cmd.execute(&session).await,
            Commands::Layer(cmd) => cmd.execute(&session).await,
            Commands::Connect(cmd) => cmd.execute(&session).await,
            Commands::Disconnect(cmd) => cmd.execute(&session).await,
            Commands::ImportMatrix(cmd) => cmd.execute(&session).await,
            Commands::Groups(cmd) => cmd.execute(&session).await,
            Commands::Types(cmd) => cmd.execute().await,
            Commands::Device(cmd) => cmd.execute(&session).await,
        }
    }
}

/// Parse a single `KEY=VALUE` pair
pub(crate) fn parse_key_val<T, U>(
    s: &str,
) -> Result<(T, U), Box<dyn std::error::Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].trim().parse()?, s[pos + 1..].trim().parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_consistent() {
        SynthnetCli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_val() {
        let (name, value) = parse_key_val::<String, f64>("Average weight=0.25").unwrap();
        assert_eq!(name, "Average weight");
        assert_eq!(value, 0.25);
        assert!(parse_key_val::<String, f64>("Average weight").is_err());
        assert!(parse_key_val::<String, f64>("Average weight=heavy").is_err());
    }
}
