//! Network store initialization

use clap::Args;
use synthnet_storage::{default_synapse_types, NetworkStore};
use tracing::info;

use super::Session;
use crate::error::CliResult;

/// Create the network store file and register the standard synapse types
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Also write the effective configuration to this path
    #[arg(long)]
    pub write_config: Option<std::path::PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub async fn execute(self, session: &Session) -> CliResult<()> {
        let mut store = session.create_store()?;
        for synapse_type in default_synapse_types() {
            store.register_synapse_type(&synapse_type)?;
            info!(
                "Registered synapse type {} ({}, table {})",
                synapse_type.id, synapse_type.description, synapse_type.parameter_table
            );
        }

        if let Some(path) = &self.write_config {
            let mut config = session.config.clone();
            config.database = Some(session.database.clone());
            config.save_to_file(path)?;
            info!("Wrote configuration to {}", path.display());
        }

        println!("Initialized network store at {}", session.database.display());
        Ok(())
    }
}
