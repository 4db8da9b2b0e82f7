//! In-memory storage backend

use crate::{
    error::{Result, StorageError},
    ids::{ConnectionGroupId, DeviceComponentId, NeuronGroupId, NeuronId, SynapseTypeId},
    records::{
        Connection, ConnectionGroup, ConnectionGroupSpec, DeviceComponent, Neuron, NeuronGroup,
        NeuronGroupSpec, Position, SynapseType,
    },
    traits::{NetworkStore, NeuronQuery},
};

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// In-memory network store.
///
/// Ids are assigned monotonically and never reused, matching an
/// auto-increment column. Connections are keyed by (pre, post), which keeps
/// `connection_exists` a map lookup.
#[derive(Debug)]
pub struct MemoryStore {
    neuron_groups: BTreeMap<NeuronGroupId, NeuronGroup>,
    neurons: BTreeMap<NeuronId, Neuron>,
    connection_groups: BTreeMap<ConnectionGroupId, ConnectionGroup>,
    connections: BTreeMap<(NeuronId, NeuronId), Connection>,
    synapse_types: BTreeMap<SynapseTypeId, SynapseType>,
    synapse_parameters: HashMap<String, BTreeSet<ConnectionGroupId>>,
    device_components: BTreeMap<DeviceComponentId, DeviceComponent>,
    next_neuron_group: u32,
    next_neuron: u32,
    next_connection_group: u32,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            neuron_groups: BTreeMap::new(),
            neurons: BTreeMap::new(),
            connection_groups: BTreeMap::new(),
            connections: BTreeMap::new(),
            synapse_types: BTreeMap::new(),
            synapse_parameters: HashMap::new(),
            device_components: BTreeMap::new(),
            next_neuron_group: 1,
            next_neuron: 1,
            next_connection_group: 1,
        }
    }

    /// Total number of connections across all groups
    pub fn total_connections(&self) -> usize {
        self.connections.len()
    }

    /// Total number of neurons across all groups
    pub fn total_neurons(&self) -> usize {
        self.neurons.len()
    }

    fn parameter_rows(&self, table: &str) -> Result<&BTreeSet<ConnectionGroupId>> {
        self.synapse_parameters
            .get(table)
            .ok_or_else(|| StorageError::invalid_table_name(table))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStore for MemoryStore {
    fn insert_neuron_group(&mut self, spec: &NeuronGroupSpec) -> Result<NeuronGroupId> {
        spec.validate()?;
        let id = NeuronGroupId::new(self.next_neuron_group);
        self.next_neuron_group += 1;
        self.neuron_groups.insert(id, NeuronGroup::from_spec(id, spec));
        Ok(id)
    }

    fn neuron_group(&self, id: NeuronGroupId) -> Result<Option<NeuronGroup>> {
        Ok(self.neuron_groups.get(&id).cloned())
    }

    fn neuron_groups(&self) -> Result<Vec<NeuronGroup>> {
        Ok(self.neuron_groups.values().cloned().collect())
    }

    fn delete_neuron_group(&mut self, id: NeuronGroupId) -> Result<()> {
        if self.neurons.values().any(|n| n.group == id) {
            return Err(StorageError::invalid_record(format!(
                "neuron group {} still has neurons",
                id
            )));
        }
        self.neuron_groups
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("NeuronGroup", id.raw()))
    }

    fn insert_neuron(&mut self, position: Position, group: NeuronGroupId) -> Result<NeuronId> {
        if !self.neuron_groups.contains_key(&group) {
            return Err(StorageError::not_found("NeuronGroup", group.raw()));
        }
        let id = NeuronId::new(self.next_neuron);
        self.next_neuron += 1;
        self.neurons.insert(id, Neuron { id, position, group });
        Ok(id)
    }

    fn delete_neurons(&mut self, group: NeuronGroupId) -> Result<u64> {
        let before = self.neurons.len();
        self.neurons.retain(|_, n| n.group != group);
        Ok((before - self.neurons.len()) as u64)
    }

    fn find_neurons(&self, query: &NeuronQuery) -> Result<Vec<Neuron>> {
        Ok(self
            .neurons
            .values()
            .filter(|n| query.matches(n))
            .copied()
            .collect())
    }

    fn neuron_page(
        &self,
        group: NeuronGroupId,
        after: Option<NeuronId>,
        limit: usize,
    ) -> Result<Vec<Neuron>> {
        let start = after.map_or(0, |id| id.raw().saturating_add(1));
        Ok(self
            .neurons
            .range(NeuronId::new(start)..)
            .map(|(_, n)| n)
            .filter(|n| n.group == group)
            .take(limit)
            .copied()
            .collect())
    }

    fn neuron_id_range(&self, group: NeuronGroupId) -> Result<Option<(NeuronId, NeuronId)>> {
        let mut ids = self.neurons.values().filter(|n| n.group == group).map(|n| n.id);
        let first = match ids.next() {
            Some(id) => id,
            None => return Ok(None),
        };
        let last = ids.last().unwrap_or(first);
        Ok(Some((first, last)))
    }

    fn neuron_count(&self, group: NeuronGroupId) -> Result<u64> {
        Ok(self.neurons.values().filter(|n| n.group == group).count() as u64)
    }

    fn find_connection_group(
        &self,
        from: NeuronGroupId,
        to: NeuronGroupId,
        connection_type: u16,
    ) -> Result<Option<ConnectionGroupId>> {
        Ok(self
            .connection_groups
            .values()
            .find(|g| {
                g.from_group == from && g.to_group == to && g.connection_type == connection_type
            })
            .map(|g| g.id))
    }

    fn insert_connection_group(&mut self, spec: &ConnectionGroupSpec) -> Result<ConnectionGroupId> {
        let id = ConnectionGroupId::new(self.next_connection_group);
        self.next_connection_group += 1;
        self.connection_groups.insert(id, ConnectionGroup::from_spec(id, spec));
        Ok(id)
    }

    fn connection_group(&self, id: ConnectionGroupId) -> Result<Option<ConnectionGroup>> {
        Ok(self.connection_groups.get(&id).cloned())
    }

    fn connection_groups(&self) -> Result<Vec<ConnectionGroup>> {
        Ok(self.connection_groups.values().cloned().collect())
    }

    fn delete_connection_group(&mut self, id: ConnectionGroupId) -> Result<()> {
        self.connection_groups.remove(&id);
        Ok(())
    }

    fn connection_exists(&self, pre: NeuronId, post: NeuronId) -> Result<bool> {
        Ok(self.connections.contains_key(&(pre, post)))
    }

    fn insert_connection(&mut self, connection: &Connection) -> Result<()> {
        self.connections
            .insert((connection.pre, connection.post), *connection);
        Ok(())
    }

    fn connections(&self, group: ConnectionGroupId) -> Result<Vec<Connection>> {
        Ok(self
            .connections
            .values()
            .filter(|c| c.group == group)
            .copied()
            .collect())
    }

    fn connection_count(&self, group: ConnectionGroupId) -> Result<u64> {
        Ok(self.connections.values().filter(|c| c.group == group).count() as u64)
    }

    fn outgoing_weights(&self, pre: NeuronId) -> Result<Vec<i8>> {
        Ok(self
            .connections
            .range((pre, NeuronId::new(0))..=(pre, NeuronId::new(u32::MAX)))
            .map(|(_, c)| c.weight)
            .collect())
    }

    fn delete_connections(&mut self, group: ConnectionGroupId) -> Result<u64> {
        let before = self.connections.len();
        self.connections.retain(|_, c| c.group != group);
        Ok((before - self.connections.len()) as u64)
    }

    fn register_synapse_type(&mut self, synapse_type: &SynapseType) -> Result<()> {
        SynapseType::validate_table_name(&synapse_type.parameter_table)?;
        self.synapse_parameters
            .entry(synapse_type.parameter_table.clone())
            .or_default();
        self.synapse_types.insert(synapse_type.id, synapse_type.clone());
        Ok(())
    }

    fn synapse_types(&self) -> Result<Vec<SynapseType>> {
        Ok(self.synapse_types.values().cloned().collect())
    }

    fn synapse_type(&self, id: SynapseTypeId) -> Result<Option<SynapseType>> {
        Ok(self.synapse_types.get(&id).cloned())
    }

    fn insert_synapse_parameters(&mut self, table: &str, group: ConnectionGroupId) -> Result<()> {
        self.synapse_parameters
            .get_mut(table)
            .ok_or_else(|| StorageError::invalid_table_name(table))?
            .insert(group);
        Ok(())
    }

    fn delete_synapse_parameters(&mut self, table: &str, group: ConnectionGroupId) -> Result<u64> {
        let rows = self
            .synapse_parameters
            .get_mut(table)
            .ok_or_else(|| StorageError::invalid_table_name(table))?;
        Ok(u64::from(rows.remove(&group)))
    }

    fn has_synapse_parameters(&self, table: &str, group: ConnectionGroupId) -> Result<bool> {
        Ok(self.parameter_rows(table)?.contains(&group))
    }

    fn insert_device_component(&mut self, component: &DeviceComponent) -> Result<()> {
        self.device_components.insert(component.id, component.clone());
        Ok(())
    }

    fn device_component(&self, id: DeviceComponentId) -> Result<Option<DeviceComponent>> {
        Ok(self.device_components.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NeuronCursor;

    fn spec(width: u32, length: u32, z: i32) -> NeuronGroupSpec {
        NeuronGroupSpec {
            position: Position::new(0, 0, z),
            width,
            length,
            spacing: 1,
            neuron_type: 1,
        }
    }

    #[test]
    fn test_lattice_group_ids_are_contiguous() {
        let mut store = MemoryStore::new();
        let a = store.insert_lattice_group(&spec(3, 2, 0)).unwrap();
        let b = store.insert_lattice_group(&spec(2, 2, 1)).unwrap();

        assert_eq!(
            store.neuron_id_range(a.id).unwrap(),
            Some((NeuronId::new(1), NeuronId::new(6)))
        );
        assert_eq!(
            store.neuron_id_range(b.id).unwrap(),
            Some((NeuronId::new(7), NeuronId::new(10)))
        );

        // Lattice order is x fastest
        let first_row = store
            .find_neurons(&NeuronQuery::in_group(a.id).y_range(0, 1))
            .unwrap();
        let ids: Vec<u32> = first_row.iter().map(|n| n.id.raw()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_cursor_pages_through_group() {
        let mut store = MemoryStore::new();
        let g = store.insert_lattice_group(&spec(5, 5, 0)).unwrap();
        let mut cursor = NeuronCursor::with_page_size(g.id, 4);
        let mut seen = Vec::new();
        while let Some(n) = cursor.next_neuron(&store).unwrap() {
            seen.push(n.id.raw());
        }
        assert_eq!(seen, (1..=25).collect::<Vec<_>>());
    }

    #[test]
    fn test_connections_and_groups() {
        let mut store = MemoryStore::new();
        let g = store.insert_lattice_group(&spec(2, 1, 0)).unwrap();
        let cg = store
            .insert_connection_group(&ConnectionGroupSpec {
                from_group: g.id,
                to_group: g.id,
                connection_type: 3,
                synapse_type: SynapseTypeId::new(1),
                parameters: String::new(),
            })
            .unwrap();
        assert_eq!(store.find_connection_group(g.id, g.id, 3).unwrap(), Some(cg));
        assert_eq!(store.find_connection_group(g.id, g.id, 4).unwrap(), None);

        let c = Connection {
            pre: NeuronId::new(1),
            post: NeuronId::new(2),
            delay: 1,
            weight: -5,
            group: cg,
        };
        store.insert_connection(&c).unwrap();
        assert!(store.connection_exists(NeuronId::new(1), NeuronId::new(2)).unwrap());
        assert!(!store.connection_exists(NeuronId::new(2), NeuronId::new(1)).unwrap());
        assert_eq!(store.outgoing_weights(NeuronId::new(1)).unwrap(), vec![-5]);

        assert_eq!(store.delete_connections(cg).unwrap(), 1);
        store.delete_connection_group(cg).unwrap();
        assert!(store.connection_group(cg).unwrap().is_none());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut store = MemoryStore::new();
        let g = store.insert_lattice_group(&spec(2, 1, 0)).unwrap();
        store.delete_neurons(g.id).unwrap();
        store.delete_neuron_group(g.id).unwrap();
        let h = store.insert_lattice_group(&spec(2, 1, 0)).unwrap();
        assert!(h.id > g.id);
        assert_eq!(
            store.neuron_id_range(h.id).unwrap(),
            Some((NeuronId::new(3), NeuronId::new(4)))
        );
    }

    #[test]
    fn test_synapse_parameter_rows() {
        let mut store = MemoryStore::new();
        store
            .register_synapse_type(&SynapseType {
                id: SynapseTypeId::new(1),
                description: "STDP1 Synapse".into(),
                parameter_table: "STDP1SynapseParameters".into(),
            })
            .unwrap();
        let cg = ConnectionGroupId::new(9);
        store.insert_synapse_parameters("STDP1SynapseParameters", cg).unwrap();
        assert!(store.has_synapse_parameters("STDP1SynapseParameters", cg).unwrap());
        assert_eq!(store.delete_synapse_parameters("STDP1SynapseParameters", cg).unwrap(), 1);
        assert_eq!(store.delete_synapse_parameters("STDP1SynapseParameters", cg).unwrap(), 0);
        assert!(store.insert_synapse_parameters("Unknown", cg).is_err());
    }
}
