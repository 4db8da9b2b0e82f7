//! Neuron layer creation

use clap::Args;
use synthnet_storage::{
    NetworkStore, NeuronGroup, NeuronGroupId, NeuronGroupSpec, NeuronQuery, Position,
};
use tracing::info;

use super::Session;
use crate::error::{CliError, CliResult};

/// Add a width x length lattice of neurons
#[derive(Args, Debug)]
pub struct LayerCommand {
    /// Neurons along x
    #[arg(long)]
    pub width: u32,

    /// Neurons along y
    #[arg(long)]
    pub length: u32,

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
}

impl LayerCommand {
    /// Execute the layer command
    pub async fn execute(self, session: &Session) -> CliResult<()> {
        let mut store = session.open_store()?;
        let spec = NeuronGroupSpec {
            position: Position::new(self.x, self.y, self.z),
            width: self.width,
            length: self.length,
            spacing: self.spacing,
            neuron_type: self.neuron_type,
        };
        spec.validate()?;

        let footprint = NeuronGroup::from_spec(NeuronGroupId::new(0), &spec);
        let occupied = store.find_neurons(
            &NeuronQuery::anywhere()
                .x_range(self.x, footprint.x_end())
                .y_range(self.y, footprint.y_end())
                .z(self.z),
        )?;
        if let Some(neuron) = occupied.first() {
            return Err(CliError::invalid_args(format!(
                "layer footprint overlaps neuron {} of layer {}",
                neuron.id, neuron.group
            )));
        }

        let group = store.insert_lattice_group(&spec)?;
        info!("Created layer {} with {} neurons", group.id, group.neuron_count());
        println!(
            "{} {}x{} at ({}, {}, {})",
            group.id,
            group.width,
            group.length,
            group.position.x,
            group.position.y,
            group.position.z
        );
        Ok(())
    }
}
