//! Connection synthesis for lattice neuron groups
//!
//! Given neuron groups held in a [`NetworkStore`](synthnet_storage::NetworkStore),
//! this crate writes the synaptic connections between them according to a
//! topology recipe:
//!
//! - center/surround receptive fields
//! - short-range excitation with long-range inhibition ("simple cortex")
//! - one-to-one and scaled topographic maps
//! - random wiring, plain or split into excitatory and inhibitory neurons
//! - device adapters mapping receptor rows onto network rows
//!
//! [`ConnectionBuilder`] creates and deletes connection groups;
//! [`import_matrix`] builds a network from a dense weight matrix. All
//! randomness flows through an injected [`RandomSource`] and long builds
//! report to a [`ProgressSink`] that can cancel them.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod geometry;
pub mod matrix;
pub mod orchestrator;
pub mod params;
pub mod progress;
pub mod random;
pub mod registry;
pub mod topology;

pub use error::{BuildError, Result};
pub use geometry::{distance, planar_distance};
pub use matrix::{group_shape, import_matrix, ImportOptions, ImportOutcome};
pub use orchestrator::{ConnectionBuilder, ConnectionDescriptor, ConnectionRequest, CreateOutcome};
pub use params::{ParameterBlob, ParameterMap};
pub use progress::{CancelAfter, NullProgress, ProgressSink};
pub use random::{quantize_weight, RandomSource};
pub use registry::{ConnectionType, ConnectionTypeRegistry, StandardRegistry};
pub use topology::{DeviceDirection, DeviceLink, Recipe, RecipeContext, RecipeOutcome};

/// Commonly used items
pub mod prelude {
    pub use crate::{
        BuildError, ConnectionBuilder, ConnectionRequest, ConnectionType, CreateOutcome,
        ParameterMap, ProgressSink, RandomSource, StandardRegistry,
    };
    pub use synthnet_storage::{NetworkStore, NeuronGroupId, SynapseTypeId};
}
