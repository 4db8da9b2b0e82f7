//! Topology recipes
//!
//! Each recipe wires a source neuron group to a destination group inside an
//! already-inserted connection group. Recipes share one contract:
//!
//! - an existing (pre, post) pair anywhere in the store is skipped, never
//!   duplicated
//! - the progress sink is polled once per outer-loop step and the recipe
//!   stops at the first cancel, keeping what it already wrote
//! - store contents that contradict a group's declared lattice are a
//!   [`BuildError::GeometryInconsistency`]

mod center_surround;
mod device;
mod simple_cortex;
mod topographic;
mod unstructured;
mod unstructured_ex_inhib;

pub use center_surround::{CenterSurround, SurroundPolarity};
pub use device::{DeviceAdapter, DeviceDirection, DeviceLink};
pub use simple_cortex::SimpleCortex;
pub use topographic::Topographic;
pub use unstructured::Unstructured;
pub use unstructured_ex_inhib::UnstructuredExInhib;

use crate::{
    error::{BuildError, Result},
    params::ParameterMap,
    progress::ProgressSink,
    random::RandomSource,
    registry::ConnectionType,
};

use synthnet_storage::{
    Connection, ConnectionGroupId, NetworkStore, Neuron, NeuronGroup, NeuronId, NeuronQuery,
};

/// What a recipe run produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecipeOutcome {
    /// Connections written
    pub connections: u64,
    /// Whether the run stopped early
    pub cancelled: bool,
}

/// A connection topology
pub trait Recipe {
    /// Label shown while the recipe runs
    fn name(&self) -> &'static str;

    /// Parameter names this recipe reads
    fn required_parameters(&self) -> &'static [&'static str];

    /// Wire `ctx.source` to `ctx.destination`
    fn execute(&self, ctx: &mut RecipeContext<'_>) -> Result<RecipeOutcome>;
}

/// Recipe implementing a connection type, or `None` for virtual types
pub fn recipe(connection_type: ConnectionType) -> Option<&'static dyn Recipe> {
    static ON_CENTER: CenterSurround = CenterSurround::new(SurroundPolarity::OnCenter);
    static OFF_CENTER: CenterSurround = CenterSurround::new(SurroundPolarity::OffCenter);
    static SIMPLE_CORTEX: SimpleCortex = SimpleCortex;
    static TOPOGRAPHIC: Topographic = Topographic;
    static UNSTRUCTURED: Unstructured = Unstructured;
    static UNSTRUCTURED_EX_INHIB: UnstructuredExInhib = UnstructuredExInhib;
    static DEVICE_ADAPTER: DeviceAdapter = DeviceAdapter;

    match connection_type {
        ConnectionType::OnCenterOffSurround => Some(&ON_CENTER),
        ConnectionType::OffCenterOnSurround => Some(&OFF_CENTER),
        ConnectionType::SimpleCortex => Some(&SIMPLE_CORTEX),
        ConnectionType::Topographic => Some(&TOPOGRAPHIC),
        ConnectionType::Unstructured => Some(&UNSTRUCTURED),
        ConnectionType::UnstructuredExInhib => Some(&UNSTRUCTURED_EX_INHIB),
        ConnectionType::DeviceAdapter => Some(&DEVICE_ADAPTER),
        ConnectionType::Virtual | ConnectionType::TempVirtual => None,
    }
}

/// Everything a recipe needs for one run
pub struct RecipeContext<'a> {
    /// Store being written
    pub store: &'a mut dyn NetworkStore,
    /// Presynaptic group
    pub source: &'a NeuronGroup,
    /// Postsynaptic group
    pub destination: &'a NeuronGroup,
    /// Recipe parameters
    pub parameters: &'a ParameterMap,
    /// Smallest delay for new connections
    pub min_delay: u32,
    /// Largest delay for new connections
    pub max_delay: u32,
    /// Connection group receiving the connections
    pub group: ConnectionGroupId,
    /// Randomness for weights, delays and sampling
    pub rng: &'a mut RandomSource,
    /// Progress and cancellation
    pub progress: &'a mut dyn ProgressSink,
    /// Device layout, for the device adapter
    pub device: Option<DeviceLink>,
    connections: u64,
}

impl<'a> RecipeContext<'a> {
    /// Assemble a context for one recipe run
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a mut dyn NetworkStore,
        source: &'a NeuronGroup,
        destination: &'a NeuronGroup,
        parameters: &'a ParameterMap,
        delays: (u32, u32),
        group: ConnectionGroupId,
        rng: &'a mut RandomSource,
        progress: &'a mut dyn ProgressSink,
    ) -> Self {
        Self {
            store,
            source,
            destination,
            parameters,
            min_delay: delays.0,
            max_delay: delays.1,
            group,
            rng,
            progress,
            device: None,
            connections: 0,
        }
    }

    /// Attach a device layout
    pub fn with_device(mut self, device: Option<DeviceLink>) -> Self {
        self.device = device;
        self
    }

    /// Connections written so far
    pub fn connections(&self) -> u64 {
        self.connections
    }

    /// Write `pre -> post` unless the pair already exists.
    ///
    /// Returns whether a connection was written.
    pub fn connect(&mut self, pre: NeuronId, post: NeuronId, weight: i8) -> Result<bool> {
        if self.store.connection_exists(pre, post)? {
            return Ok(false);
        }
        let delay = self.rng.sample_delay(self.min_delay, self.max_delay)?;
        self.store.insert_connection(&Connection {
            pre,
            post,
            delay,
            weight,
            group: self.group,
        })?;
        self.connections += 1;
        Ok(true)
    }

    /// Poll for cancellation
    pub fn cancelled(&mut self) -> bool {
        self.progress.was_cancelled()
    }

    /// Start a progress phase
    pub fn begin(&mut self, label: &str, total_steps: u64) {
        self.progress.reset();
        self.progress.set_label_text(label);
        self.progress.set_total_steps(total_steps);
    }

    /// Outcome of the run so far
    pub fn finish(&self, cancelled: bool) -> RecipeOutcome {
        RecipeOutcome {
            connections: self.connections,
            cancelled,
        }
    }

    /// Neurons of a group inside a rectangle of its own z plane
    pub fn neurons_in(&self, group: &NeuronGroup, query: NeuronQuery) -> Result<Vec<Neuron>> {
        let mut query = query.z(group.position.z);
        query.group = Some(group.id);
        Ok(self.store.find_neurons(&query)?)
    }
}

/// Lattice column and row of a neuron, or a geometry error if it is off-lattice
pub(crate) fn lattice_coords(group: &NeuronGroup, neuron: &Neuron) -> Result<(u32, u32)> {
    group.lattice_coords(neuron.position).ok_or_else(|| {
        BuildError::geometry(format!(
            "neuron {} at ({}, {}, {}) is not on the lattice of group {}",
            neuron.id, neuron.position.x, neuron.position.y, neuron.position.z, group.id
        ))
    })
}

/// Contiguous id range of a group, checked against its neuron count
pub(crate) fn contiguous_ids(
    store: &dyn NetworkStore,
    group: &NeuronGroup,
) -> Result<(NeuronId, NeuronId)> {
    let (min, max) = store
        .neuron_id_range(group.id)?
        .ok_or_else(|| BuildError::geometry(format!("group {} has no neurons", group.id)))?;
    let count = store.neuron_count(group.id)?;
    let span = u64::from(max.raw() - min.raw()) + 1;
    if span != count || count != group.neuron_count() {
        return Err(BuildError::geometry(format!(
            "group {} ids {}..={} do not match its {} neurons ({}x{})",
            group.id,
            min,
            max,
            count,
            group.width,
            group.length
        )));
    }
    Ok((min, max))
}
