//! Error types for connection synthesis

use synthnet_storage::{DeviceComponentId, NeuronGroupId, NeuronId, StorageError};
use thiserror::Error;

/// Result type for synthesis operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors raised while building connections.
///
/// Conflicts, empty recipes and rejected imports are reported as outcome
/// values, not through this type.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The network store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Store contents contradict a group's declared geometry
    #[error("Geometry inconsistency: {reason}")]
    GeometryInconsistency {
        /// What did not add up
        reason: String,
    },

    /// The requested topology has no recipe yet
    #[error("Topology {name} is not implemented")]
    UnimplementedTopology {
        /// Topology name
        name: &'static str,
    },

    /// A neuron already has both excitatory and inhibitory outgoing connections
    #[error("Neuron {neuron} has both positive and negative outgoing weights")]
    MixedPolarity {
        /// Offending neuron
        neuron: NeuronId,
    },

    /// Delay bounds cannot be sampled
    #[error("Invalid delay range: min {min}, max {max}")]
    InvalidDelay {
        /// Lower bound
        min: u32,
        /// Upper bound
        max: u32,
    },

    /// A recipe parameter was not supplied
    #[error("Missing parameter {name:?}")]
    MissingParameter {
        /// Parameter name
        name: String,
    },

    /// Parameter values are unusable for this topology
    #[error("Invalid parameters: {reason}")]
    InvalidParameters {
        /// Reason for rejection
        reason: String,
    },

    /// A stored parameter blob could not be decoded
    #[error("Invalid parameter blob: {reason}")]
    InvalidBlob {
        /// Reason decoding failed
        reason: String,
    },

    /// A referenced neuron group does not exist
    #[error("Neuron group {0} not found")]
    GroupNotFound(NeuronGroupId),

    /// A referenced device component does not exist
    #[error("Device component {0} not found")]
    DeviceComponentNotFound(DeviceComponentId),
}

impl BuildError {
    /// Create a geometry inconsistency error
    pub fn geometry(reason: impl Into<String>) -> Self {
        Self::GeometryInconsistency {
            reason: reason.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create an invalid parameters error
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// Create an invalid blob error
    pub fn invalid_blob(reason: impl Into<String>) -> Self {
        Self::InvalidBlob {
            reason: reason.into(),
        }
    }
}
