//! Creating and deleting connection groups
//!
//! [`ConnectionBuilder`] is the entry point for wiring two neuron groups: it
//! guards the one-group-per-(from, to, type) rule, persists the parameter
//! blob, runs the recipe and cleans up after recipes that produced nothing.

use crate::{
    error::{BuildError, Result},
    params::{ParameterBlob, ParameterMap},
    progress::ProgressSink,
    random::RandomSource,
    registry::{ConnectionType, ConnectionTypeRegistry},
    topology::{self, DeviceLink, RecipeContext},
};

use log::{debug, info, warn};
use synthnet_storage::{
    ConnectionGroupId, ConnectionGroupSpec, NetworkStore, NeuronGroup, NeuronGroupId, SynapseTypeId,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything needed to wire one group to another
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionRequest {
    /// Presynaptic group
    pub from_group: NeuronGroupId,
    /// Postsynaptic group
    pub to_group: NeuronGroupId,
    /// Topology
    pub connection_type: ConnectionType,
    /// Synapse type of the new connections
    pub synapse_type: SynapseTypeId,
    /// Overrides of the registry defaults
    pub parameters: ParameterMap,
    /// Smallest delay
    pub min_delay: u32,
    /// Largest delay
    pub max_delay: u32,
    /// Device layout, for device adapters
    pub device: Option<DeviceLink>,
}

impl ConnectionRequest {
    /// Request with default parameters and a delay of 1
    pub fn new(
        from_group: NeuronGroupId,
        to_group: NeuronGroupId,
        connection_type: ConnectionType,
        synapse_type: SynapseTypeId,
    ) -> Self {
        Self {
            from_group,
            to_group,
            connection_type,
            synapse_type,
            parameters: ParameterMap::new(),
            min_delay: 1,
            max_delay: 1,
            device: None,
        }
    }

    /// Override one parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name, value);
        self
    }

    /// Set the delay bounds
    pub fn with_delays(mut self, min_delay: u32, max_delay: u32) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    /// Attach a device layout
    pub fn with_device(mut self, device: DeviceLink) -> Self {
        self.device = Some(device);
        self
    }
}

/// Result of [`ConnectionBuilder::create_connections`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CreateOutcome {
    /// A connection group was created
    Created {
        /// New group id
        group: ConnectionGroupId,
        /// Connections written
        connections: u64,
        /// Whether the recipe stopped early
        cancelled: bool,
    },
    /// A group already links these layers with this topology; nothing was written
    Conflict {
        /// The existing group
        existing: ConnectionGroupId,
    },
    /// The recipe wrote nothing, so the group was removed again
    NoConnections {
        /// Whether the recipe stopped early
        cancelled: bool,
    },
}

/// Identifies a connection group by its endpoints and topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionDescriptor {
    /// Presynaptic group
    pub from_group: NeuronGroupId,
    /// Postsynaptic group
    pub to_group: NeuronGroupId,
    /// Topology
    pub connection_type: ConnectionType,
}

/// Runs connection recipes against a store
pub struct ConnectionBuilder<'a> {
    store: &'a mut dyn NetworkStore,
    registry: &'a dyn ConnectionTypeRegistry,
    rng: &'a mut RandomSource,
    progress: &'a mut dyn ProgressSink,
}

impl<'a> ConnectionBuilder<'a> {
    /// Create a builder
    pub fn new(
        store: &'a mut dyn NetworkStore,
        registry: &'a dyn ConnectionTypeRegistry,
        rng: &'a mut RandomSource,
        progress: &'a mut dyn ProgressSink,
    ) -> Self {
        Self {
            store,
            registry,
            rng,
            progress,
        }
    }

    /// Registry defaults overlaid with the request's parameters
    fn resolve_parameters(&self, request: &ConnectionRequest) -> Result<ParameterMap> {
        let mut parameters = self.registry.parameters(request.connection_type);
        for (name, value) in request.parameters.iter() {
            if !parameters.contains(name) {
                return Err(BuildError::invalid_parameters(format!(
                    "{} has no parameter {:?}",
                    self.registry.description(request.connection_type),
                    name
                )));
            }
            parameters.insert(name, value);
        }
        Ok(parameters)
    }

    fn neuron_group(&self, id: NeuronGroupId) -> Result<NeuronGroup> {
        self.store
            .neuron_group(id)?
            .ok_or(BuildError::GroupNotFound(id))
    }

    /// Wire `request.from_group` to `request.to_group`.
    ///
    /// Conflicts and empty results are reported in the outcome. Store errors
    /// and geometry inconsistencies abort the recipe and are returned as
    /// `Err`. Connections written before the failure are kept along with
    /// their group; a group that received none is removed.
    pub fn create_connections(&mut self, request: &ConnectionRequest) -> Result<CreateOutcome> {
        let connection_type = request.connection_type;
        if let Some(existing) =
            self.store
                .find_connection_group(request.from_group, request.to_group, connection_type.id())?
        {
            debug!(
                "{} -> {} already connected by {} ({})",
                request.from_group, request.to_group, existing, connection_type
            );
            return Ok(CreateOutcome::Conflict { existing });
        }

        if request.min_delay > request.max_delay || request.max_delay > u32::from(u8::MAX) {
            return Err(BuildError::InvalidDelay {
                min: request.min_delay,
                max: request.max_delay,
            });
        }
        let parameters = self.resolve_parameters(request)?;
        let source = self.neuron_group(request.from_group)?;
        let destination = self.neuron_group(request.to_group)?;
        let parameter_table = if connection_type.is_virtual() {
            None
        } else {
            let synapse_type = self.store.synapse_type(request.synapse_type)?.ok_or_else(|| {
                BuildError::invalid_parameters(format!(
                    "unknown synapse type {}",
                    request.synapse_type
                ))
            })?;
            Some(synapse_type.parameter_table)
        };

        let blob = ParameterBlob {
            parameters,
            min_delay: request.min_delay,
            max_delay: request.max_delay,
        };
        let group = self.store.insert_connection_group(&ConnectionGroupSpec {
            from_group: request.from_group,
            to_group: request.to_group,
            connection_type: connection_type.id(),
            synapse_type: request.synapse_type,
            parameters: blob.encode(),
        })?;

        let Some(recipe) = topology::recipe(connection_type) else {
            info!(
                "Created {} group {} for {} -> {}",
                connection_type, group, request.from_group, request.to_group
            );
            return Ok(CreateOutcome::Created {
                group,
                connections: 0,
                cancelled: false,
            });
        };

        let (result, written) = {
            let mut ctx = RecipeContext::new(
                &mut *self.store,
                &source,
                &destination,
                &blob.parameters,
                (request.min_delay, request.max_delay),
                group,
                &mut *self.rng,
                &mut *self.progress,
            )
            .with_device(request.device);
            let result = recipe.execute(&mut ctx);
            (result, ctx.connections())
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) if written == 0 => {
                warn!("{} failed for group {}: {}", recipe.name(), group, err);
                self.discard(group, None)?;
                return Err(err);
            }
            Err(err) => {
                // partial writes stay for inspection
                warn!(
                    "{} failed for group {} after {} connections; leaving them in place: {}",
                    recipe.name(),
                    group,
                    written,
                    err
                );
                return Err(err);
            }
        };

        if outcome.connections == 0 {
            info!(
                "{} produced no connections for {} -> {}",
                recipe.name(),
                request.from_group,
                request.to_group
            );
            self.discard(group, None)?;
            return Ok(CreateOutcome::NoConnections {
                cancelled: outcome.cancelled,
            });
        }

        if let Some(table) = parameter_table {
            self.store.insert_synapse_parameters(&table, group)?;
        }
        info!(
            "Created {} group {} for {} -> {} with {} connections{}",
            connection_type,
            group,
            request.from_group,
            request.to_group,
            outcome.connections,
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        Ok(CreateOutcome::Created {
            group,
            connections: outcome.connections,
            cancelled: outcome.cancelled,
        })
    }

    /// Delete the groups matching each descriptor together with their
    /// connections and synapse parameter rows. Returns how many groups were
    /// removed; descriptors matching nothing are skipped.
    pub fn delete_connections(&mut self, descriptors: &[ConnectionDescriptor]) -> Result<usize> {
        let tables: Vec<String> = self
            .store
            .synapse_types()?
            .into_iter()
            .map(|t| t.parameter_table)
            .collect();

        let mut deleted = 0;
        for descriptor in descriptors {
            let found = self.store.find_connection_group(
                descriptor.from_group,
                descriptor.to_group,
                descriptor.connection_type.id(),
            )?;
            let Some(group) = found else {
                warn!(
                    "No {} group between {} and {}",
                    descriptor.connection_type, descriptor.from_group, descriptor.to_group
                );
                continue;
            };
            let connections = self.discard(group, Some(&tables))?;
            info!("Deleted group {} and {} connections", group, connections);
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Remove a group, its connections and, when given, its rows in each parameter table
    fn discard(&mut self, group: ConnectionGroupId, tables: Option<&[String]>) -> Result<u64> {
        let connections = self.store.delete_connections(group)?;
        for table in tables.unwrap_or_default() {
            self.store.delete_synapse_parameters(table, group)?;
        }
        self.store.delete_connection_group(group)?;
        Ok(connections)
    }
}
