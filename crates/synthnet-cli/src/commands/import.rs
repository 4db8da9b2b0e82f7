//! Weight matrix import

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Args;
use synthnet_core::{import_matrix, ConnectionType, ImportOptions, ImportOutcome, StandardRegistry};
use synthnet_storage::{Position, SynapseTypeId};
use tracing::info;

use super::Session;
use crate::error::{CliError, CliResult};
use crate::progress::{cancel_on_ctrl_c, BarProgress};

/// Build one layer from an N x N comma separated weight matrix
#[derive(Args, Debug)]
pub struct ImportCommand {
    /// Matrix file; row i holds the weights from neuron i
    pub matrix: PathBuf,

    /// X of the first neuron
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub x: i32,

    /// Y of the first neuron
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub y: i32,

    /// Plane of the layer
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub z: i32,

    /// Distance between neighbouring neurons
    #[arg(long, default_value_t = 1)]
    pub spacing: u32,

    /// Neuron type id
    #[arg(long, default_value_t = 1)]
    pub neuron_type: u16,

    /// Connection type recorded on the new group
    #[arg(long = "type", default_value = "unstructured")]
    pub connection_type: ConnectionType,

    /// Synapse type id (defaults to the configured one)
    #[arg(long)]
    pub synapse_type: Option<u16>,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

impl ImportCommand {
    /// Execute the import command
    pub async fn execute(self, session: &Session) -> CliResult<()> {
        if !self.matrix.exists() {
            return Err(CliError::missing_resource(format!(
                "matrix file {} does not exist",
                self.matrix.display()
            )));
        }
        let reader = BufReader::new(File::open(&self.matrix)?);
        let mut store = session.open_store()?;
        let options = ImportOptions {
            origin: Position::new(self.x, self.y, self.z),
            spacing: self.spacing,
            neuron_type: self.neuron_type,
            connection_type: self.connection_type,
            synapse_type: SynapseTypeId::new(
                self.synapse_type.unwrap_or(session.config.connections.synapse_type),
            ),
        };
        let visible = session.config.preferences.show_progress && !self.quiet;
        let cancel = cancel_on_ctrl_c();

        info!("Importing weight matrix {}", self.matrix.display());
        let outcome = tokio::task::spawn_blocking(move || {
            let mut progress = BarProgress::new(visible, cancel);
            let outcome =
                import_matrix(&mut store, &StandardRegistry, reader, &options, &mut progress);
            progress.finish();
            outcome
        })
        .await??;

        match outcome {
            ImportOutcome::Imported { neuron_group, connection_group, connections } => {
                println!(
                    "Imported {} with {} holding {} connections",
                    neuron_group, connection_group, connections
                );
                Ok(())
            }
            ImportOutcome::Rejected(reason) => Err(CliError::rejected(reason)),
        }
    }
}
