//! Connection types and their parameter defaults

use crate::params::ParameterMap;

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Topology used to wire one neuron group to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionType {
    /// Excitatory receptive-field center with an inhibitory surround
    OnCenterOffSurround,
    /// Inhibitory center with an excitatory surround (declared, not implemented)
    OffCenterOnSurround,
    /// Short-range excitation and long-range inhibition within a sheet
    SimpleCortex,
    /// One-to-one or scaled point-to-area mapping
    Topographic,
    /// Random wiring at a fixed density
    Unstructured,
    /// Random wiring with separate excitatory and inhibitory populations
    UnstructuredExInhib,
    /// Receptor rows of a device layer mapped onto network rows
    DeviceAdapter,
    /// Bookkeeping link with no connections
    Virtual,
    /// Short-lived bookkeeping link with no connections.
    ///
    /// Handled exactly like [`ConnectionType::Virtual`]: it has no recipe,
    /// its group is kept with zero connections and it gets no synapse
    /// parameter row.
    TempVirtual,
}

impl ConnectionType {
    /// Every connection type, in id order
    pub const ALL: [ConnectionType; 9] = [
        Self::OnCenterOffSurround,
        Self::OffCenterOnSurround,
        Self::SimpleCortex,
        Self::Topographic,
        Self::Unstructured,
        Self::UnstructuredExInhib,
        Self::DeviceAdapter,
        Self::Virtual,
        Self::TempVirtual,
    ];

    /// Identifier stored in the connection group row
    pub const fn id(self) -> u16 {
        match self {
            Self::OnCenterOffSurround => 1,
            Self::OffCenterOnSurround => 2,
            Self::SimpleCortex => 3,
            Self::Topographic => 4,
            Self::Unstructured => 5,
            Self::UnstructuredExInhib => 6,
            Self::DeviceAdapter => 7,
            Self::Virtual => 8,
            Self::TempVirtual => 9,
        }
    }

    /// Look a type up by stored identifier
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Short command-line name
    pub const fn name(self) -> &'static str {
        match self {
            Self::OnCenterOffSurround => "on-center-off-surround",
            Self::OffCenterOnSurround => "off-center-on-surround",
            Self::SimpleCortex => "simple-cortex",
            Self::Topographic => "topographic",
            Self::Unstructured => "unstructured",
            Self::UnstructuredExInhib => "unstructured-ex-inhib",
            Self::DeviceAdapter => "device-adapter",
            Self::Virtual => "virtual",
            Self::TempVirtual => "temp-virtual",
        }
    }

    /// Whether groups of this type carry no connections
    pub const fn is_virtual(self) -> bool {
        matches!(self, Self::Virtual | Self::TempVirtual)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| {
                t.name() == wanted
                    || StandardRegistry.description(*t).to_ascii_lowercase() == wanted
            })
            .ok_or_else(|| format!("unknown connection type {:?}", s))
    }
}

/// Parameter names and defaults for each connection type
pub trait ConnectionTypeRegistry {
    /// Default parameters of a type
    fn parameters(&self, connection_type: ConnectionType) -> ParameterMap;

    /// Human readable description of a type
    fn description(&self, connection_type: ConnectionType) -> &str;

    /// Type with the given description
    fn connection_type(&self, description: &str) -> Option<ConnectionType>;
}

/// Built-in registry covering every [`ConnectionType`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRegistry;

const CENTER_SURROUND_DEFAULTS: &[(&str, f64)] = &[
    ("Outer width", 3.0),
    ("Outer length", 3.0),
    ("Inner width", 1.0),
    ("Inner length", 1.0),
    ("Overlap", 0.0),
    ("Rotate", 0.0),
    ("Excitation weight", 0.8),
    ("Excitation weight range", 0.2),
    ("Inhibition weight", -0.5),
    ("Inhibition weight range", 0.2),
    ("Normal weight distribution", 0.0),
];

const SIMPLE_CORTEX_DEFAULTS: &[(&str, f64)] = &[
    ("Excitation radius", 5.0),
    ("Excitation density", 0.8),
    ("Excitation weight", 0.8),
    ("Excitation weight range", 0.2),
    ("Inhibition radius", 10.0),
    ("Inhibition density", 0.5),
    ("Inhibition weight", -0.8),
    ("Inhibition weight range", 0.2),
    ("Overlap", 0.0),
    ("Normal weight distribution", 0.0),
];

const TOPOGRAPHIC_DEFAULTS: &[(&str, f64)] = &[
    ("Overlap", 0.0),
    ("Rotate", 0.0),
    ("Average weight", 0.5),
    ("Weight range", 0.5),
    ("Normal weight distribution", 0.0),
];

const UNSTRUCTURED_DEFAULTS: &[(&str, f64)] = &[
    ("Connection density", 0.1),
    ("Average weight", 0.5),
    ("Weight range", 0.1),
    ("Normal weight distribution", 0.0),
];

const UNSTRUCTURED_EX_INHIB_DEFAULTS: &[(&str, f64)] = &[
    ("Excitatory percentage", 80.0),
    ("Excitation connection prob", 0.1),
    ("Excitation weight", 0.5),
    ("Excitation weight range", 0.1),
    ("Inhibition connection prob", 0.1),
    ("Inhibition weight", -0.5),
    ("Inhibition weight range", 0.1),
    ("Normal weight distribution", 0.0),
];

const DEVICE_ADAPTER_DEFAULTS: &[(&str, f64)] = &[("Average weight", 0.5), ("Weight range", 0.1)];

impl StandardRegistry {
    fn defaults(connection_type: ConnectionType) -> &'static [(&'static str, f64)] {
        match connection_type {
            ConnectionType::OnCenterOffSurround | ConnectionType::OffCenterOnSurround => {
                CENTER_SURROUND_DEFAULTS
            }
            ConnectionType::SimpleCortex => SIMPLE_CORTEX_DEFAULTS,
            ConnectionType::Topographic => TOPOGRAPHIC_DEFAULTS,
            ConnectionType::Unstructured => UNSTRUCTURED_DEFAULTS,
            ConnectionType::UnstructuredExInhib => UNSTRUCTURED_EX_INHIB_DEFAULTS,
            ConnectionType::DeviceAdapter => DEVICE_ADAPTER_DEFAULTS,
            ConnectionType::Virtual | ConnectionType::TempVirtual => &[],
        }
    }
}

impl ConnectionTypeRegistry for StandardRegistry {
    fn parameters(&self, connection_type: ConnectionType) -> ParameterMap {
        Self::defaults(connection_type).iter().copied().collect()
    }

    fn description(&self, connection_type: ConnectionType) -> &str {
        match connection_type {
            ConnectionType::OnCenterOffSurround => "On center off surround",
            ConnectionType::OffCenterOnSurround => "Off center on surround",
            ConnectionType::SimpleCortex => "Simple cortex",
            ConnectionType::Topographic => "Topographic",
            ConnectionType::Unstructured => "Unstructured",
            ConnectionType::UnstructuredExInhib => "Unstructured excitatory inhibitory",
            ConnectionType::DeviceAdapter => "Device adapter",
            ConnectionType::Virtual => "Virtual",
            ConnectionType::TempVirtual => "Temporary virtual",
        }
    }

    fn connection_type(&self, description: &str) -> Option<ConnectionType> {
        ConnectionType::ALL
            .into_iter()
            .find(|t| self.description(*t) == description)
    }
}
