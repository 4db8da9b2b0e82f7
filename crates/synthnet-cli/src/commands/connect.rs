//! Connection group creation

use clap::{Args, ValueEnum};
use synthnet_core::{
    ConnectionBuilder, ConnectionRequest, ConnectionType, CreateOutcome, DeviceDirection,
    DeviceLink, RandomSource, StandardRegistry,
};
use synthnet_storage::{DeviceComponentId, NeuronGroupId, SynapseTypeId};
use tracing::{info, warn};

use super::{parse_key_val, Session};
use crate::error::{CliError, CliResult};
use crate::progress::{cancel_on_ctrl_c, BarProgress};

/// Which side of a device adapter is presynaptic
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The device layer drives the network layer
    DeviceToNetwork,
    /// The network layer drives the device layer
    NetworkToDevice,
}

impl From<Direction> for DeviceDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::DeviceToNetwork => DeviceDirection::DeviceToNetwork,
            Direction::NetworkToDevice => DeviceDirection::NetworkToDevice,
        }
    }
}

/// Wire one layer to another with a topology recipe
#[derive(Args, Debug)]
pub struct ConnectCommand {
    /// Presynaptic layer id
    #[arg(long)]
    pub from: u32,

    /// Postsynaptic layer id
    #[arg(long)]
    pub to: u32,

    /// Topology, by name (e.g. `topographic`) or description
    #[arg(long = "type")]
    pub connection_type: ConnectionType,

    /// Synapse type id (defaults to the configured one)
    #[arg(long)]
    pub synapse_type: Option<u16>,

    /// Parameter override, e.g. --param "Average weight=0.4"
    #[arg(long = "param", value_parser = parse_key_val::<String, f64>)]
    pub parameters: Vec<(String, f64)>,

    /// Smallest delay for new connections
    #[arg(long)]
    pub min_delay: Option<u32>,

    /// Largest delay for new connections
    #[arg(long)]
    pub max_delay: Option<u32>,

    /// Random seed for reproducible wiring
    #[arg(long)]
    pub seed: Option<u64>,

    /// Device component for device adapters
    #[arg(long)]
    pub device: Option<u32>,

    /// Adapter direction
    #[arg(long, value_enum, default_value_t = Direction::DeviceToNetwork)]
    pub direction: Direction,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

impl ConnectCommand {
    fn request(&self, session: &Session) -> CliResult<ConnectionRequest> {
        let defaults = &session.config.connections;
        let synapse = SynapseTypeId::new(self.synapse_type.unwrap_or(defaults.synapse_type));
        let min_delay = self.min_delay.unwrap_or(defaults.min_delay);
        let max_delay = self.max_delay.unwrap_or(defaults.max_delay.max(min_delay));

        let mut request = ConnectionRequest::new(
            NeuronGroupId::new(self.from),
            NeuronGroupId::new(self.to),
            self.connection_type,
            synapse,
        )
        .with_delays(min_delay, max_delay);
        for (name, value) in &self.parameters {
            request = request.with_parameter(name.clone(), *value);
        }

        match (self.connection_type, self.device) {
            (ConnectionType::DeviceAdapter, Some(component)) => {
                request = request.with_device(DeviceLink {
                    component: DeviceComponentId::new(component),
                    direction: self.direction.into(),
                });
            }
            (ConnectionType::DeviceAdapter, None) => {
                return Err(CliError::invalid_args("device adapters need --device"));
            }
            (_, Some(_)) => warn!("--device only applies to device adapters; ignoring it"),
            (_, None) => {}
        }
        Ok(request)
    }

    /// Execute the connect command
    pub async fn execute(self, session: &Session) -> CliResult<()> {
        let request = self.request(session)?;
        let mut store = session.open_store()?;
        let seed = self.seed.or(session.config.connections.seed);
        let visible = session.config.preferences.show_progress && !self.quiet;
        let cancel = cancel_on_ctrl_c();

        info!(
            "Connecting {} -> {} with {} (delays {}..={})",
            request.from_group,
            request.to_group,
            request.connection_type,
            request.min_delay,
            request.max_delay
        );
        let (outcome, request) = tokio::task::spawn_blocking(move || {
            let mut rng = seed.map_or_else(RandomSource::from_entropy, RandomSource::seeded);
            let mut progress = BarProgress::new(visible, cancel);
            let outcome =
                ConnectionBuilder::new(&mut store, &StandardRegistry, &mut rng, &mut progress)
                    .create_connections(&request);
            progress.finish();
            (outcome, request)
        })
        .await?;

        match outcome? {
            CreateOutcome::Created { group, connections, cancelled } => {
                if cancelled {
                    warn!(
                        "Build cancelled; keeping the {} connections written so far",
                        connections
                    );
                }
                println!("Created {} with {} connections", group, connections);
                Ok(())
            }
            CreateOutcome::Conflict { existing } => Err(CliError::rejected(format!(
                "{} and {} are already connected by {} ({})",
                request.from_group, request.to_group, existing, request.connection_type
            ))),
            CreateOutcome::NoConnections { cancelled: true } => Err(CliError::Cancelled),
            CreateOutcome::NoConnections { cancelled: false } => Err(CliError::rejected(format!(
                "{} produced no connections between {} and {}",
                request.connection_type, request.from_group, request.to_group
            ))),
        }
    }
}
