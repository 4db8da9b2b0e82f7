//! Importing a network from a dense weight matrix
//!
//! Each input line holds one matrix row of comma-separated weights. The
//! matrix must be square; cell `(i, j) > 0` becomes a connection from neuron
//! `i` to neuron `j` of a freshly created, roughly square neuron group.

use crate::{
    error::{BuildError, Result},
    params::ParameterBlob,
    progress::ProgressSink,
    random::quantize_weight,
    registry::{ConnectionType, ConnectionTypeRegistry},
};

use log::{debug, info, warn};
use std::io::BufRead;
use synthnet_storage::{
    Connection, ConnectionGroupId, ConnectionGroupSpec, NetworkStore, NeuronGroupId,
    NeuronGroupSpec, NeuronQuery, Position, SynapseTypeId,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where and how an imported matrix is laid out
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImportOptions {
    /// Origin of the new group
    pub origin: Position,
    /// Lattice spacing of the new group
    pub spacing: u32,
    /// Neuron type of the new group
    pub neuron_type: u16,
    /// Topology recorded on the connection group
    pub connection_type: ConnectionType,
    /// Synapse type of the imported connections
    pub synapse_type: SynapseTypeId,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            origin: Position::new(0, 0, 0),
            spacing: 1,
            neuron_type: 1,
            connection_type: ConnectionType::Unstructured,
            synapse_type: SynapseTypeId::new(1),
        }
    }
}

/// Result of [`import_matrix`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImportOutcome {
    /// The matrix was imported
    Imported {
        /// New neuron group
        neuron_group: NeuronGroupId,
        /// New connection group
        connection_group: ConnectionGroupId,
        /// Connections written
        connections: u64,
    },
    /// The input was unusable; everything created for it was removed
    Rejected(String),
}

/// Rows created so far, removed again if the import is rejected
#[derive(Default)]
struct Created {
    neuron_group: Option<NeuronGroupId>,
    connection_group: Option<ConnectionGroupId>,
    parameter_table: Option<String>,
}

impl Created {
    fn roll_back(&self, store: &mut dyn NetworkStore) -> Result<()> {
        if let Some(group) = self.connection_group {
            store.delete_connections(group)?;
            if let Some(table) = &self.parameter_table {
                store.delete_synapse_parameters(table, group)?;
            }
            store.delete_connection_group(group)?;
        }
        if let Some(group) = self.neuron_group {
            store.delete_neurons(group)?;
            store.delete_neuron_group(group)?;
        }
        Ok(())
    }
}

/// Most nearly square `width x length` holding exactly `n` neurons
pub fn group_shape(n: usize) -> Option<(u32, u32)> {
    if n == 0 {
        return None;
    }
    let mut width = (n as f64).sqrt().floor() as usize;
    // correct for rounding in the float square root
    while width * width > n {
        width -= 1;
    }
    while (width + 1) * (width + 1) <= n {
        width += 1;
    }
    let length = n / width;
    if width * length != n {
        return None;
    }
    Some((u32::try_from(width).ok()?, u32::try_from(length).ok()?))
}

fn parse_row(line: &str, row: usize) -> std::result::Result<Vec<f64>, String> {
    line.split(',')
        .enumerate()
        .map(|(col, cell)| {
            cell.trim().parse::<f64>().map_err(|_| {
                format!(
                    "row {}, column {}: {:?} is not a number",
                    row + 1,
                    col + 1,
                    cell.trim()
                )
            })
        })
        .collect()
}

/// Import a square weight matrix as a new neuron group and one intra-group connection group.
///
/// Malformed input, an occupied footprint, an empty matrix, read failures
/// and cancellation produce [`ImportOutcome::Rejected`] after every row
/// created for the import has been removed. Store errors are returned as
/// `Err`.
pub fn import_matrix<R: BufRead>(
    store: &mut dyn NetworkStore,
    registry: &dyn ConnectionTypeRegistry,
    reader: R,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
) -> Result<ImportOutcome> {
    let parameter_table = if options.connection_type.is_virtual() {
        None
    } else {
        let synapse_type = store.synapse_type(options.synapse_type)?.ok_or_else(|| {
            BuildError::invalid_parameters(format!("unknown synapse type {}", options.synapse_type))
        })?;
        Some(synapse_type.parameter_table)
    };

    let mut created = Created::default();
    match load(store, registry, reader, options, progress, &mut created, parameter_table)? {
        Ok(outcome) => Ok(outcome),
        Err(reason) => {
            warn!("Matrix import rejected: {}", reason);
            created.roll_back(store)?;
            Ok(ImportOutcome::Rejected(reason))
        }
    }
}

/// Inner import loop; the inner `Err` is a rejection reason
fn load<R: BufRead>(
    store: &mut dyn NetworkStore,
    registry: &dyn ConnectionTypeRegistry,
    reader: R,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
    created: &mut Created,
    parameter_table: Option<String>,
) -> Result<std::result::Result<ImportOutcome, String>> {
    let mut lines = reader.lines().filter(|l| !matches!(l, Ok(text) if text.trim().is_empty()));

    let first = match lines.next() {
        None => return Ok(Err("matrix is empty".to_string())),
        Some(Err(e)) => return Ok(Err(format!("read failed: {}", e))),
        Some(Ok(line)) => line,
    };
    let first = match parse_row(&first, 0) {
        Ok(row) => row,
        Err(reason) => return Ok(Err(reason)),
    };
    let n = first.len();
    let Some((width, length)) = group_shape(n) else {
        return Ok(Err(format!("{} neurons cannot be laid out as a rectangle", n)));
    };

    let spec = NeuronGroupSpec {
        position: options.origin,
        width,
        length,
        spacing: options.spacing,
        neuron_type: options.neuron_type,
    };
    spec.validate()?;
    let spacing = i64::from(options.spacing);
    let x_end = i64::from(options.origin.x) + i64::from(width) * spacing;
    let y_end = i64::from(options.origin.y) + i64::from(length) * spacing;
    let (Ok(x_end), Ok(y_end)) = (i32::try_from(x_end), i32::try_from(y_end)) else {
        return Ok(Err("group does not fit in the coordinate space".to_string()));
    };
    let footprint = NeuronQuery::anywhere()
        .x_range(options.origin.x, x_end)
        .y_range(options.origin.y, y_end)
        .z(options.origin.z);
    let occupied = store.find_neurons(&footprint)?;
    if let Some(neuron) = occupied.first() {
        return Ok(Err(format!(
            "footprint {}x{} at ({}, {}, {}) overlaps neuron {} of group {}",
            width,
            length,
            options.origin.x,
            options.origin.y,
            options.origin.z,
            neuron.id,
            neuron.group
        )));
    }

    let group = store.insert_lattice_group(&spec)?;
    created.neuron_group = Some(group.id);
    let (first_id, _) = store
        .neuron_id_range(group.id)?
        .ok_or_else(|| BuildError::geometry(format!("group {} has no neurons", group.id)))?;
    info!("Created {}x{} group {} for a {}x{} matrix", width, length, group.id, n, n);

    let blob = ParameterBlob {
        parameters: registry.parameters(options.connection_type),
        min_delay: 0,
        max_delay: 0,
    };
    let connection_group = store.insert_connection_group(&ConnectionGroupSpec {
        from_group: group.id,
        to_group: group.id,
        connection_type: options.connection_type.id(),
        synapse_type: options.synapse_type,
        parameters: blob.encode(),
    })?;
    created.connection_group = Some(connection_group);

    progress.reset();
    progress.set_label_text("Importing matrix");
    progress.set_total_steps(n as u64);

    let neuron = |index: usize| first_id.offset(index as u32);
    let mut connections = 0u64;
    let mut row_index = 0usize;
    let mut pending = Some(first);
    loop {
        let row = match pending.take() {
            Some(row) => row,
            None => match lines.next() {
                None => break,
                Some(Err(e)) => return Ok(Err(format!("read failed: {}", e))),
                Some(Ok(line)) => match parse_row(&line, row_index) {
                    Ok(row) => row,
                    Err(reason) => return Ok(Err(reason)),
                },
            },
        };
        if progress.was_cancelled() {
            return Ok(Err("import cancelled".to_string()));
        }
        if row_index >= n {
            return Ok(Err(format!("matrix has more than {} rows", n)));
        }
        if row.len() != n {
            return Ok(Err(format!(
                "row {} has {} columns, expected {}",
                row_index + 1,
                row.len(),
                n
            )));
        }
        for (col, &w) in row.iter().enumerate() {
            if w > 0.0 {
                store.insert_connection(&Connection {
                    pre: neuron(row_index),
                    post: neuron(col),
                    delay: 0,
                    weight: quantize_weight(w),
                    group: connection_group,
                })?;
                connections += 1;
            }
        }
        row_index += 1;
        progress.set_progress(row_index as u64);
    }

    if row_index != n {
        return Ok(Err(format!("matrix has {} rows but {} columns", row_index, n)));
    }
    if connections == 0 {
        return Ok(Err("matrix has no positive weights".to_string()));
    }
    if let Some(table) = parameter_table {
        store.insert_synapse_parameters(&table, connection_group)?;
        created.parameter_table = Some(table);
    }
    debug!("Imported {} connections into {}", connections, connection_group);

    Ok(Ok(ImportOutcome::Imported {
        neuron_group: group.id,
        connection_group,
        connections,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CancelAfter, NullProgress};
    use crate::registry::StandardRegistry;
    use synthnet_storage::{default_synapse_types, MemoryStore};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for t in default_synapse_types() {
            store.register_synapse_type(&t).unwrap();
        }
        store
    }

    fn import(store: &mut MemoryStore, text: &str) -> ImportOutcome {
        import_matrix(
            store,
            &StandardRegistry,
            text.as_bytes(),
            &ImportOptions::default(),
            &mut NullProgress,
        )
        .unwrap()
    }

    #[test]
    fn test_group_shape() {
        assert_eq!(group_shape(9), Some((3, 3)));
        assert_eq!(group_shape(3), Some((1, 3)));
        assert_eq!(group_shape(12), Some((3, 4)));
        assert_eq!(group_shape(16), Some((4, 4)));
        assert_eq!(group_shape(7), None);
        assert_eq!(group_shape(0), None);
    }

    #[test]
    fn test_rejects_non_square() {
        let mut store = store();
        let outcome = import(&mut store, "0,1,0\n1,0,1\n");
        assert!(matches!(outcome, ImportOutcome::Rejected(_)));
        assert!(store.neuron_groups().unwrap().is_empty());
        assert!(store.connection_groups().unwrap().is_empty());
        assert_eq!(store.total_neurons(), 0);
        assert_eq!(store.total_connections(), 0);
    }

    #[test]
    fn test_rejects_ragged_rows_and_bad_cells() {
        let mut store = store();
        assert!(matches!(import(&mut store, "0,1\n1\n"), ImportOutcome::Rejected(_)));
        assert!(matches!(import(&mut store, "0,x\n1,0\n"), ImportOutcome::Rejected(_)));
        assert!(matches!(import(&mut store, ""), ImportOutcome::Rejected(_)));
        assert_eq!(store.total_neurons(), 0);
        assert!(store.connection_groups().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_all_zero_matrix() {
        let mut store = store();
        let outcome = import(&mut store, "0,0\n0,0\n");
        assert_eq!(outcome, ImportOutcome::Rejected("matrix has no positive weights".to_string()));
        assert_eq!(store.total_neurons(), 0);
    }

    #[test]
    fn test_rejects_occupied_footprint() {
        let mut store = store();
        assert!(matches!(import(&mut store, "0,1\n1,0\n"), ImportOutcome::Imported { .. }));
        let outcome = import(&mut store, "0,1\n1,0\n");
        assert!(matches!(outcome, ImportOutcome::Rejected(_)));
        assert_eq!(store.neuron_groups().unwrap().len(), 1);
    }

    #[test]
    fn test_cancel_rolls_back() {
        let mut store = store();
        let outcome = import_matrix(
            &mut store,
            &StandardRegistry,
            "0,1\n1,0\n".as_bytes(),
            &ImportOptions::default(),
            &mut CancelAfter::new(1),
        )
        .unwrap();
        assert_eq!(outcome, ImportOutcome::Rejected("import cancelled".to_string()));
        assert_eq!(store.total_connections(), 0);
        assert_eq!(store.total_neurons(), 0);
    }
}
