//! Network store for the synthnet connection synthesis engine
//!
//! This crate holds the record types of a neural network description
//! (neuron groups, neurons, connection groups, connections, synapse types
//! and device components), the `NetworkStore` trait the engine writes
//! through, and two backends: an in-memory store for tests and tooling and
//! a SQLite store for persistent networks.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;
pub mod ids;
pub mod records;
pub mod traits;

// Storage backends
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export essential types
pub use error::{Result, StorageError};
pub use ids::{ConnectionGroupId, DeviceComponentId, NeuronGroupId, NeuronId, SynapseTypeId};
pub use records::{
    Connection, ConnectionGroup, ConnectionGroupSpec, DeviceComponent, Neuron, NeuronGroup,
    NeuronGroupSpec, Position, Receptor, SynapseType,
};
pub use traits::{NetworkStore, NeuronCursor, NeuronQuery};

// Re-export implementations
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Storage crate version for compatibility checking
pub const STORAGE_VERSION: u32 = 1;

/// Synapse types every fresh network starts with
pub fn default_synapse_types() -> Vec<SynapseType> {
    vec![
        SynapseType {
            id: SynapseTypeId::new(1),
            description: "STDP1 Synapse".to_string(),
            parameter_table: "STDP1SynapseParameters".to_string(),
        },
        SynapseType {
            id: SynapseTypeId::new(2),
            description: "Weightless Synapse".to_string(),
            parameter_table: "WeightlessSynapseParameters".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_synapse_types() {
        let types = default_synapse_types();
        assert!(!types.is_empty());
        for t in &types {
            assert!(SynapseType::validate_table_name(&t.parameter_table).is_ok());
        }

        let mut ids: Vec<_> = types.iter().map(|t| t.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), types.len(), "Synapse type ids must be distinct");
    }
}
