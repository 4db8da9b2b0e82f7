//! Row types held by a network store

use crate::{
    error::{Result, StorageError},
    ids::{ConnectionGroupId, DeviceComponentId, NeuronGroupId, NeuronId, SynapseTypeId},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Integer position in network space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl Position {
    /// Create a new position
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Shape of a neuron group before the store has assigned it an id
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronGroupSpec {
    /// Lattice origin
    pub position: Position,
    /// Neurons along x
    pub width: u32,
    /// Neurons along y
    pub length: u32,
    /// Distance between adjacent neurons
    pub spacing: u32,
    /// Neuron type reference
    pub neuron_type: u16,
}

impl NeuronGroupSpec {
    /// Reject shapes that cannot hold a lattice
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.length == 0 {
            return Err(StorageError::invalid_record(format!(
                "neuron group must have positive extent, got {}x{}",
                self.width, self.length
            )));
        }
        if self.spacing == 0 {
            return Err(StorageError::invalid_record("neuron group spacing must be positive"));
        }
        let fits = |origin: i32, cells: u32| {
            i64::from(origin) + i64::from(cells) * i64::from(self.spacing) <= i64::from(i32::MAX)
        };
        if !fits(self.position.x, self.width) || !fits(self.position.y, self.length) {
            return Err(StorageError::invalid_record(format!(
                "{}x{} lattice with spacing {} at ({}, {}) leaves the coordinate range",
                self.width, self.length, self.spacing, self.position.x, self.position.y
            )));
        }
        Ok(())
    }
}

/// `origin + cells * spacing`, saturated to the `i32` range
fn lattice_offset(origin: i32, cells: u32, spacing: u32) -> i32 {
    let value = i64::from(origin) + i64::from(cells) * i64::from(spacing);
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// A rectangular lattice of neurons
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronGroup {
    /// Group id
    pub id: NeuronGroupId,
    /// Lattice origin
    pub position: Position,
    /// Neurons along x
    pub width: u32,
    /// Neurons along y
    pub length: u32,
    /// Distance between adjacent neurons
    pub spacing: u32,
    /// Neuron type reference
    pub neuron_type: u16,
}

impl NeuronGroup {
    /// Attach an id to a group shape
    pub fn from_spec(id: NeuronGroupId, spec: &NeuronGroupSpec) -> Self {
        Self {
            id,
            position: spec.position,
            width: spec.width,
            length: spec.length,
            spacing: spec.spacing,
            neuron_type: spec.neuron_type,
        }
    }

    /// Number of neurons in the lattice
    pub fn neuron_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.length)
    }

    /// Position of the neuron at lattice column `col` and row `row`.
    ///
    /// Coordinates saturate for lattices that fail [`NeuronGroupSpec::validate`].
    pub fn lattice_position(&self, col: u32, row: u32) -> Position {
        Position::new(
            lattice_offset(self.position.x, col, self.spacing),
            lattice_offset(self.position.y, row, self.spacing),
            self.position.z,
        )
    }

    /// Lattice column and row of a position, if it lies on this group's lattice
    pub fn lattice_coords(&self, position: Position) -> Option<(u32, u32)> {
        let spacing = i64::from(self.spacing);
        let dx = i64::from(position.x) - i64::from(self.position.x);
        let dy = i64::from(position.y) - i64::from(self.position.y);
        if position.z != self.position.z || spacing == 0 || dx < 0 || dy < 0 {
            return None;
        }
        if dx % spacing != 0 || dy % spacing != 0 {
            return None;
        }
        let col = u32::try_from(dx / spacing).ok()?;
        let row = u32::try_from(dy / spacing).ok()?;
        (col < self.width && row < self.length).then_some((col, row))
    }

    /// X coordinate one spacing past the last column
    pub fn x_end(&self) -> i32 {
        lattice_offset(self.position.x, self.width, self.spacing)
    }

    /// Y coordinate one spacing past the last row
    pub fn y_end(&self) -> i32 {
        lattice_offset(self.position.y, self.length, self.spacing)
    }
}

/// A single neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neuron {
    /// Neuron id
    pub id: NeuronId,
    /// Position in network space
    pub position: Position,
    /// Owning group
    pub group: NeuronGroupId,
}

/// A connection group before the store has assigned it an id
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionGroupSpec {
    /// Presynaptic group
    pub from_group: NeuronGroupId,
    /// Postsynaptic group
    pub to_group: NeuronGroupId,
    /// Topology identifier
    pub connection_type: u16,
    /// Synapse type
    pub synapse_type: SynapseTypeId,
    /// Serialized parameter blob
    pub parameters: String,
}

/// Bundle of connections created by one recipe invocation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionGroup {
    /// Group id
    pub id: ConnectionGroupId,
    /// Presynaptic group
    pub from_group: NeuronGroupId,
    /// Postsynaptic group
    pub to_group: NeuronGroupId,
    /// Topology identifier
    pub connection_type: u16,
    /// Synapse type
    pub synapse_type: SynapseTypeId,
    /// Serialized parameter blob
    pub parameters: String,
}

impl ConnectionGroup {
    /// Attach an id to a group spec
    pub fn from_spec(id: ConnectionGroupId, spec: &ConnectionGroupSpec) -> Self {
        Self {
            id,
            from_group: spec.from_group,
            to_group: spec.to_group,
            connection_type: spec.connection_type,
            synapse_type: spec.synapse_type,
            parameters: spec.parameters.clone(),
        }
    }
}

/// A synaptic connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Connection {
    /// Presynaptic neuron
    pub pre: NeuronId,
    /// Postsynaptic neuron
    pub post: NeuronId,
    /// Transmission delay in time steps
    pub delay: u8,
    /// Quantized weight, `round(w * 127)` for `w` in [-1, 1]
    pub weight: i8,
    /// Owning connection group
    pub group: ConnectionGroupId,
}

/// Synapse type with the name of its per-group parameter table
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapseType {
    /// Type id
    pub id: SynapseTypeId,
    /// Human readable description
    pub description: String,
    /// Table holding one parameter row per connection group of this type
    pub parameter_table: String,
}

impl SynapseType {
    /// Parameter table names end up inside statements; only plain identifiers are allowed
    pub fn validate_table_name(name: &str) -> Result<()> {
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(StorageError::invalid_table_name(name))
        }
    }
}

/// One receptor of a device component, spanning `rows` lattice rows of the device layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Receptor {
    /// Receptor id within the device
    pub id: u32,
    /// Number of device-layer rows covered
    pub rows: u32,
}

/// Ordered receptor layout of an external device
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceComponent {
    /// Component id
    pub id: DeviceComponentId,
    /// Human readable description
    pub description: String,
    /// Receptors in device-layer row order
    pub receptors: Vec<Receptor>,
}

impl DeviceComponent {
    /// Total rows the component occupies in the device layer
    pub fn total_rows(&self) -> u32 {
        self.receptors.iter().fold(0, |rows, r| rows.saturating_add(r.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> NeuronGroup {
        NeuronGroup {
            id: NeuronGroupId::new(1),
            position: Position::new(10, 20, 5),
            width: 4,
            length: 3,
            spacing: 2,
            neuron_type: 1,
        }
    }

    #[test]
    fn test_lattice_position_roundtrip() {
        let g = group();
        let p = g.lattice_position(3, 2);
        assert_eq!(p, Position::new(16, 24, 5));
        assert_eq!(g.lattice_coords(p), Some((3, 2)));
    }

    #[test]
    fn test_lattice_coords_rejects_off_lattice() {
        let g = group();
        assert_eq!(g.lattice_coords(Position::new(11, 20, 5)), None);
        assert_eq!(g.lattice_coords(Position::new(18, 20, 5)), None);
        assert_eq!(g.lattice_coords(Position::new(10, 20, 6)), None);
        assert_eq!(g.lattice_coords(Position::new(8, 20, 5)), None);
    }

    #[test]
    fn test_extent() {
        let g = group();
        assert_eq!(g.neuron_count(), 12);
        assert_eq!(g.x_end(), 18);
        assert_eq!(g.y_end(), 26);
    }

    #[test]
    fn test_spec_validation() {
        let mut spec = NeuronGroupSpec {
            position: Position::default(),
            width: 2,
            length: 2,
            spacing: 1,
            neuron_type: 1,
        };
        assert!(spec.validate().is_ok());
        spec.width = 0;
        assert!(spec.validate().is_err());
        spec.width = 2;
        spec.spacing = 0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_lattice_past_coordinate_range_is_rejected() {
        let mut spec = NeuronGroupSpec {
            position: Position::new(i32::MAX - 5, 0, 0),
            width: 5,
            length: 1,
            spacing: 1,
            neuron_type: 1,
        };
        assert!(spec.validate().is_ok());
        spec.width = 10;
        assert!(spec.validate().is_err());
        spec.position.x = 0;
        spec.width = 3;
        spec.spacing = u32::MAX;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_extent_math_does_not_overflow() {
        let g = NeuronGroup {
            id: NeuronGroupId::new(1),
            position: Position::new(i32::MAX - 1, i32::MIN, 0),
            width: u32::MAX,
            length: u32::MAX,
            spacing: u32::MAX,
            neuron_type: 1,
        };
        assert_eq!(g.x_end(), i32::MAX);
        assert_eq!(g.lattice_position(2, 0).x, i32::MAX);
        assert_eq!(g.lattice_coords(Position::new(i32::MIN, 0, 0)), None);
        assert_eq!(g.lattice_coords(Position::new(i32::MAX - 1, i32::MAX, 0)), Some((0, 1)));
        assert_eq!(g.lattice_coords(Position::new(i32::MAX - 1, i32::MIN, 0)), Some((0, 0)));
    }

    #[test]
    fn test_table_name_validation() {
        assert!(SynapseType::validate_table_name("STDP1SynapseParameters").is_ok());
        assert!(SynapseType::validate_table_name("_params").is_ok());
        assert!(SynapseType::validate_table_name("1table").is_err());
        assert!(SynapseType::validate_table_name("a b").is_err());
        assert!(SynapseType::validate_table_name("").is_err());
    }
}
