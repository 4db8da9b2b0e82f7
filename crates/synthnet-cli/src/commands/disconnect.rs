//! Connection group removal

use clap::Args;
use synthnet_core::{
    ConnectionBuilder, ConnectionDescriptor, ConnectionType, NullProgress, RandomSource,
    StandardRegistry,
};
use synthnet_storage::NeuronGroupId;
use tracing::info;

use super::Session;
use crate::error::CliResult;

/// Delete the connection group linking two layers with one topology
#[derive(Args, Debug)]
pub struct DisconnectCommand {
    /// Presynaptic layer id
    #[arg(long)]
    pub from: u32,

    /// Postsynaptic layer id
    #[arg(long)]
    pub to: u32,

    /// Topology of the group to remove
    #[arg(long = "type")]
    pub connection_type: ConnectionType,
}

impl DisconnectCommand {
    /// Execute the disconnect command
    pub async fn execute(self, session: &Session) -> CliResult<()> {
        let mut store = session.open_store()?;
        let descriptor = ConnectionDescriptor {
            from_group: NeuronGroupId::new(self.from),
            to_group: NeuronGroupId::new(self.to),
            connection_type: self.connection_type,
        };

        // Deletion draws no random numbers
        let mut rng = RandomSource::seeded(0);
        let mut progress = NullProgress;
        let deleted = ConnectionBuilder::new(&mut store, &StandardRegistry, &mut rng, &mut progress)
            .delete_connections(&[descriptor])?;

        info!("Deleted {} connection group(s)", deleted);
        println!("Deleted {} connection group(s)", deleted);
        Ok(())
    }
}
