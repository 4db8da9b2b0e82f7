//! Device-to-network adapters

use super::{lattice_coords, Recipe, RecipeContext, RecipeOutcome};
use crate::error::{BuildError, Result};

use log::debug;
use std::collections::HashMap;
use synthnet_storage::{DeviceComponentId, NeuronGroup, NeuronId, NeuronQuery};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which side of an adapter is presynaptic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceDirection {
    /// Device layer drives the network layer
    DeviceToNetwork,
    /// Network layer drives the device layer
    NetworkToDevice,
}

/// Device component attached to an adapter request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceLink {
    /// Component whose receptor layout is used
    pub component: DeviceComponentId,
    /// Connection direction
    pub direction: DeviceDirection,
}

/// Maps receptor `k`'s row span in the device layer onto row `k` of the
/// network layer, column for column. Both layers share one width.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceAdapter;

const PARAMETERS: &[&str] = &["Average weight", "Weight range"];

/// Neurons of one lattice row span keyed by column
fn row_span(
    ctx: &RecipeContext<'_>,
    group: &NeuronGroup,
    first_row: u32,
    rows: u32,
) -> Result<Vec<(u32, NeuronId)>> {
    let last_row = first_row.checked_add(rows).ok_or_else(|| {
        BuildError::geometry(format!(
            "row span {}+{} of group {} overflows",
            first_row, rows, group.id
        ))
    })?;
    let y0 = group.lattice_position(0, first_row).y;
    let y1 = group.lattice_position(0, last_row).y;
    ctx.neurons_in(group, NeuronQuery::anywhere().y_range(y0, y1))?
        .iter()
        .map(|n| lattice_coords(group, n).map(|(col, _)| (col, n.id)))
        .collect()
}

/// Exactly one network neuron per column of lattice row `row`
fn row_targets(
    ctx: &RecipeContext<'_>,
    network: &NeuronGroup,
    row: u32,
) -> Result<HashMap<u32, NeuronId>> {
    let mut targets = HashMap::new();
    for (col, id) in row_span(ctx, network, row, 1)? {
        if let Some(previous) = targets.insert(col, id) {
            return Err(BuildError::geometry(format!(
                "neurons {} and {} both sit at column {} of row {} in group {}",
                previous, id, col, row, network.id
            )));
        }
    }
    if targets.len() as u64 != u64::from(network.width) {
        return Err(BuildError::geometry(format!(
            "row {} of group {} holds {} neurons, expected {}",
            row,
            network.id,
            targets.len(),
            network.width
        )));
    }
    Ok(targets)
}

impl Recipe for DeviceAdapter {
    fn name(&self) -> &'static str {
        "Device adapter"
    }

    fn required_parameters(&self) -> &'static [&'static str] {
        PARAMETERS
    }

    fn execute(&self, ctx: &mut RecipeContext<'_>) -> Result<RecipeOutcome> {
        let link = ctx.device.ok_or_else(|| {
            BuildError::invalid_parameters("device adapter needs a device component")
        })?;
        let average = ctx.parameters.get("Average weight")?;
        let range = ctx.parameters.get("Weight range")?;
        let component = ctx
            .store
            .device_component(link.component)?
            .ok_or(BuildError::DeviceComponentNotFound(link.component))?;

        let (device, network) = match link.direction {
            DeviceDirection::DeviceToNetwork => (ctx.source, ctx.destination),
            DeviceDirection::NetworkToDevice => (ctx.destination, ctx.source),
        };
        if device.width != network.width {
            return Err(BuildError::geometry(format!(
                "device layer {} is {} wide but network layer {} is {} wide",
                device.id, device.width, network.id, network.width
            )));
        }
        if component.total_rows() > device.length {
            return Err(BuildError::geometry(format!(
                "component {} needs {} rows but device layer {} has {}",
                component.id,
                component.total_rows(),
                device.id,
                device.length
            )));
        }
        if component.receptors.len() as u64 > u64::from(network.length) {
            return Err(BuildError::geometry(format!(
                "component {} has {} receptors but network layer {} has {} rows",
                component.id,
                component.receptors.len(),
                network.id,
                network.length
            )));
        }

        ctx.begin(self.name(), component.receptors.len() as u64);
        debug!(
            "Device adapter {} ({:?}) between {} and {}",
            component.id, link.direction, device.id, network.id
        );

        let mut device_row = 0u32;
        for (k, receptor) in (0u32..).zip(component.receptors.iter()) {
            if ctx.cancelled() {
                return Ok(ctx.finish(true));
            }
            let targets = row_targets(ctx, network, k)?;
            for (col, device_neuron) in row_span(ctx, device, device_row, receptor.rows)? {
                let network_neuron = *targets.get(&col).ok_or_else(|| {
                    BuildError::geometry(format!(
                        "no neuron at column {} of row {} in group {}",
                        col, k, network.id
                    ))
                })?;
                let (pre, post) = match link.direction {
                    DeviceDirection::DeviceToNetwork => (device_neuron, network_neuron),
                    DeviceDirection::NetworkToDevice => (network_neuron, device_neuron),
                };
                let weight = ctx.rng.synthesize_weight(average, range, false);
                ctx.connect(pre, post, weight)?;
            }
            device_row = device_row.saturating_add(receptor.rows);
            ctx.progress.set_progress(u64::from(k) + 1);
        }

        Ok(ctx.finish(false))
    }
}
