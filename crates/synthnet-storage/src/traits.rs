//! Core trait definitions for the storage layer

use crate::{
    error::Result,
    ids::{ConnectionGroupId, DeviceComponentId, NeuronGroupId, NeuronId, SynapseTypeId},
    records::{
        Connection, ConnectionGroup, ConnectionGroupSpec, DeviceComponent, Neuron, NeuronGroup,
        NeuronGroupSpec, Position, SynapseType,
    },
};

use std::collections::VecDeque;
use std::ops::Bound;

/// Rectangle query over neuron positions.
///
/// Each axis carries explicit `Bound`s so callers decide whether a window
/// edge is inclusive or exclusive. Results are always returned in ascending
/// id order.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuronQuery {
    /// Restrict to one group, or search every group
    pub group: Option<NeuronGroupId>,
    /// Bounds on x
    pub x: (Bound<i32>, Bound<i32>),
    /// Bounds on y
    pub y: (Bound<i32>, Bound<i32>),
    /// Exact z, if constrained
    pub z: Option<i32>,
}

impl NeuronQuery {
    /// Every neuron of a group
    pub fn in_group(group: NeuronGroupId) -> Self {
        Self {
            group: Some(group),
            ..Self::anywhere()
        }
    }

    /// Every neuron in the store
    pub fn anywhere() -> Self {
        Self {
            group: None,
            x: (Bound::Unbounded, Bound::Unbounded),
            y: (Bound::Unbounded, Bound::Unbounded),
            z: None,
        }
    }

    /// Neurons at exactly this position
    pub fn at(group: NeuronGroupId, position: Position) -> Self {
        Self::in_group(group)
            .x_bounds(Bound::Included(position.x), Bound::Included(position.x))
            .y_bounds(Bound::Included(position.y), Bound::Included(position.y))
            .z(position.z)
    }

    /// Set x bounds
    pub fn x_bounds(mut self, lower: Bound<i32>, upper: Bound<i32>) -> Self {
        self.x = (lower, upper);
        self
    }

    /// Set y bounds
    pub fn y_bounds(mut self, lower: Bound<i32>, upper: Bound<i32>) -> Self {
        self.y = (lower, upper);
        self
    }

    /// Half-open x range `[start, end)`
    pub fn x_range(self, start: i32, end: i32) -> Self {
        self.x_bounds(Bound::Included(start), Bound::Excluded(end))
    }

    /// Half-open y range `[start, end)`
    pub fn y_range(self, start: i32, end: i32) -> Self {
        self.y_bounds(Bound::Included(start), Bound::Excluded(end))
    }

    /// Constrain z
    pub fn z(mut self, z: i32) -> Self {
        self.z = Some(z);
        self
    }

    /// Whether a neuron satisfies this query
    pub fn matches(&self, neuron: &Neuron) -> bool {
        self.group.map_or(true, |g| g == neuron.group)
            && within(neuron.position.x, &self.x)
            && within(neuron.position.y, &self.y)
            && self.z.map_or(true, |z| z == neuron.position.z)
    }
}

fn within(value: i32, bounds: &(Bound<i32>, Bound<i32>)) -> bool {
    let lower = match bounds.0 {
        Bound::Included(b) => value >= b,
        Bound::Excluded(b) => value > b,
        Bound::Unbounded => true,
    };
    let upper = match bounds.1 {
        Bound::Included(b) => value <= b,
        Bound::Excluded(b) => value < b,
        Bound::Unbounded => true,
    };
    lower && upper
}

/// Primary interface to the relational network store.
///
/// The store owns id assignment: every `insert_*` returns the id it
/// assigned. The trait is object safe so recipes can run against
/// `&mut dyn NetworkStore`.
pub trait NetworkStore {
    /// Insert a neuron group row (no neurons)
    fn insert_neuron_group(&mut self, spec: &NeuronGroupSpec) -> Result<NeuronGroupId>;

    /// Look up a neuron group
    fn neuron_group(&self, id: NeuronGroupId) -> Result<Option<NeuronGroup>>;

    /// All neuron groups, ordered by id
    fn neuron_groups(&self) -> Result<Vec<NeuronGroup>>;

    /// Delete a neuron group row; its neurons must already be gone
    fn delete_neuron_group(&mut self, id: NeuronGroupId) -> Result<()>;

    /// Insert a single neuron
    fn insert_neuron(&mut self, position: Position, group: NeuronGroupId) -> Result<NeuronId>;

    /// Delete every neuron of a group, returning how many were removed
    fn delete_neurons(&mut self, group: NeuronGroupId) -> Result<u64>;

    /// Neurons matching a rectangle query, ascending by id
    fn find_neurons(&self, query: &NeuronQuery) -> Result<Vec<Neuron>>;

    /// Up to `limit` neurons of a group with id greater than `after`, ascending by id
    fn neuron_page(
        &self,
        group: NeuronGroupId,
        after: Option<NeuronId>,
        limit: usize,
    ) -> Result<Vec<Neuron>>;

    /// Lowest and highest neuron id of a group
    fn neuron_id_range(&self, group: NeuronGroupId) -> Result<Option<(NeuronId, NeuronId)>>;

    /// Number of neurons in a group
    fn neuron_count(&self, group: NeuronGroupId) -> Result<u64>;

    /// Existing connection group for a (from, to, type) triple
    fn find_connection_group(
        &self,
        from: NeuronGroupId,
        to: NeuronGroupId,
        connection_type: u16,
    ) -> Result<Option<ConnectionGroupId>>;

    /// Insert a connection group row and return its assigned id
    fn insert_connection_group(&mut self, spec: &ConnectionGroupSpec) -> Result<ConnectionGroupId>;

    /// Look up a connection group
    fn connection_group(&self, id: ConnectionGroupId) -> Result<Option<ConnectionGroup>>;

    /// All connection groups, ordered by id
    fn connection_groups(&self) -> Result<Vec<ConnectionGroup>>;

    /// Delete a connection group row
    fn delete_connection_group(&mut self, id: ConnectionGroupId) -> Result<()>;

    /// Whether any connection exists for the ordered pair
    fn connection_exists(&self, pre: NeuronId, post: NeuronId) -> Result<bool>;

    /// Insert one connection
    fn insert_connection(&mut self, connection: &Connection) -> Result<()>;

    /// Connections of a group, ordered by (pre, post)
    fn connections(&self, group: ConnectionGroupId) -> Result<Vec<Connection>>;

    /// Number of connections in a group
    fn connection_count(&self, group: ConnectionGroupId) -> Result<u64>;

    /// Weights of every connection leaving `pre`, across all groups
    fn outgoing_weights(&self, pre: NeuronId) -> Result<Vec<i8>>;

    /// Delete every connection of a group, returning how many were removed
    fn delete_connections(&mut self, group: ConnectionGroupId) -> Result<u64>;

    /// Register a synapse type and make sure its parameter table exists
    fn register_synapse_type(&mut self, synapse_type: &SynapseType) -> Result<()>;

    /// All registered synapse types
    fn synapse_types(&self) -> Result<Vec<SynapseType>>;

    /// Look up a synapse type
    fn synapse_type(&self, id: SynapseTypeId) -> Result<Option<SynapseType>>;

    /// Insert a default parameter row keyed by connection group
    fn insert_synapse_parameters(&mut self, table: &str, group: ConnectionGroupId) -> Result<()>;

    /// Delete parameter rows keyed by connection group
    fn delete_synapse_parameters(&mut self, table: &str, group: ConnectionGroupId) -> Result<u64>;

    /// Whether a parameter row exists for a connection group
    fn has_synapse_parameters(&self, table: &str, group: ConnectionGroupId) -> Result<bool>;

    /// Store a device component layout, replacing any previous one with the same id
    fn insert_device_component(&mut self, component: &DeviceComponent) -> Result<()>;

    /// Look up a device component
    fn device_component(&self, id: DeviceComponentId) -> Result<Option<DeviceComponent>>;

    /// Insert a group and all of its neurons in lattice order (x fastest, then y).
    ///
    /// Backends that batch writes should override this.
    fn insert_lattice_group(&mut self, spec: &NeuronGroupSpec) -> Result<NeuronGroup> {
        spec.validate()?;
        let id = self.insert_neuron_group(spec)?;
        let group = NeuronGroup::from_spec(id, spec);
        for row in 0..group.length {
            for col in 0..group.width {
                self.insert_neuron(group.lattice_position(col, row), id)?;
            }
        }
        Ok(group)
    }
}

/// Forward-only cursor over the neurons of a group.
///
/// Fetches pages of ascending ids so the outer loops of large recipes never
/// hold a whole group in memory and never keep a borrow of the store open
/// between steps.
#[derive(Debug)]
pub struct NeuronCursor {
    group: NeuronGroupId,
    page_size: usize,
    last: Option<NeuronId>,
    buffer: VecDeque<Neuron>,
    exhausted: bool,
}

impl NeuronCursor {
    /// Default number of rows fetched per page
    pub const DEFAULT_PAGE_SIZE: usize = 1024;

    /// Create a cursor over a group
    pub fn new(group: NeuronGroupId) -> Self {
        Self::with_page_size(group, Self::DEFAULT_PAGE_SIZE)
    }

    /// Create a cursor with a custom page size
    pub fn with_page_size(group: NeuronGroupId, page_size: usize) -> Self {
        Self {
            group,
            page_size: page_size.max(1),
            last: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next neuron in id order, or `None` when the group is exhausted
    pub fn next_neuron(&mut self, store: &dyn NetworkStore) -> Result<Option<Neuron>> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = store.neuron_page(self.group, self.last, self.page_size)?;
            if page.len() < self.page_size {
                self.exhausted = true;
            }
            self.buffer.extend(page);
        }
        let next = self.buffer.pop_front();
        if let Some(neuron) = next {
            self.last = Some(neuron.id);
        }
        Ok(next)
    }
}
