//! ID types for the storage layer

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct NeuronId(pub u32);

impl NeuronId {
    /// Create a new neuron ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// The neuron `offset` places after this one in id order
    pub const fn offset(&self, offset: u32) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Unique identifier for a neuron group (layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct NeuronGroupId(pub u32);

impl NeuronGroupId {
    /// Create a new neuron group ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NeuronGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Unique identifier for a connection group, assigned by the store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ConnectionGroupId(pub u32);

impl ConnectionGroupId {
    /// Create a new connection group ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Identifier of a synapse type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct SynapseTypeId(pub u16);

impl SynapseTypeId {
    /// Create a new synapse type ID
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for SynapseTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Identifier of a device component (a sensor or actuator block)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct DeviceComponentId(pub u32);

impl DeviceComponentId {
    /// Create a new device component ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_id() {
        let id = NeuronId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.offset(3), NeuronId::new(45));
        assert_eq!(format!("{}", id), "N42");
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(format!("{}", NeuronGroupId::new(1)), "L1");
        assert_eq!(format!("{}", ConnectionGroupId::new(2)), "C2");
        assert_eq!(format!("{}", SynapseTypeId::new(3)), "T3");
        assert_eq!(format!("{}", DeviceComponentId::new(4)), "D4");
    }

    #[test]
    fn test_ordering() {
        assert!(NeuronId::new(1) < NeuronId::new(2));
        assert!(ConnectionGroupId::new(1) < ConnectionGroupId::new(2));
    }
}
