//! Short-range excitation, long-range inhibition

use super::{Recipe, RecipeContext, RecipeOutcome};
use crate::error::{BuildError, Result};
use crate::geometry::planar_distance;

use log::debug;
use std::ops::Bound;
use synthnet_storage::{Neuron, NeuronCursor, NeuronQuery};

/// Each source neuron excites destination neurons within the excitation
/// radius and inhibits those in the ring from `excitation radius - overlap`
/// out to the inhibition radius. Radii are in position units; acceptance is
/// distance-weighted through [`RandomSource::radial_probability`].
///
/// [`RandomSource::radial_probability`]: crate::random::RandomSource::radial_probability
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleCortex;

const PARAMETERS: &[&str] = &[
    "Excitation radius",
    "Excitation density",
    "Excitation weight",
    "Excitation weight range",
    "Inhibition radius",
    "Inhibition density",
    "Inhibition weight",
    "Inhibition weight range",
    "Overlap",
    "Normal weight distribution",
];

fn square_around(center: &Neuron, radius: f64) -> NeuronQuery {
    // bounding box, inclusive on both sides
    let r = radius.floor() as i32;
    let (x, y) = (center.position.x, center.position.y);
    NeuronQuery::anywhere()
        .x_bounds(Bound::Included(x.saturating_sub(r)), Bound::Included(x.saturating_add(r)))
        .y_bounds(Bound::Included(y.saturating_sub(r)), Bound::Included(y.saturating_add(r)))
}

impl Recipe for SimpleCortex {
    fn name(&self) -> &'static str {
        "Simple cortex"
    }

    fn required_parameters(&self) -> &'static [&'static str] {
        PARAMETERS
    }

    fn execute(&self, ctx: &mut RecipeContext<'_>) -> Result<RecipeOutcome> {
        let p = ctx.parameters;
        let ex_radius = p.get("Excitation radius")?;
        let ex_density = p.get("Excitation density")?;
        let ex_weight = (p.get("Excitation weight")?, p.get("Excitation weight range")?);
        let in_radius = p.get("Inhibition radius")?;
        let in_density = p.get("Inhibition density")?;
        let in_weight = (p.get("Inhibition weight")?, p.get("Inhibition weight range")?);
        let overlap = p.get("Overlap")?;
        let normal = p.flag("Normal weight distribution")?;
        if ex_radius < 0.0 || in_radius < 0.0 {
            return Err(BuildError::invalid_parameters("radii must not be negative"));
        }
        let inner_ring = ex_radius - overlap;

        let (source, destination) = (ctx.source, ctx.destination);
        ctx.begin(self.name(), source.neuron_count());
        debug!(
            "Simple cortex {} -> {}: excitation r={} d={}, inhibition r={} d={}",
            source.id, destination.id, ex_radius, ex_density, in_radius, in_density
        );

        let mut cursor = NeuronCursor::new(source.id);
        let mut done = 0u64;
        while let Some(pre) = cursor.next_neuron(&*ctx.store)? {
            if ctx.cancelled() {
                return Ok(ctx.finish(true));
            }

            for post in ctx.neurons_in(destination, square_around(&pre, ex_radius))? {
                if post.id == pre.id {
                    continue;
                }
                let d = planar_distance(pre.position, post.position);
                if d > ex_radius || !ctx.rng.radial_probability(ex_radius, d, ex_density) {
                    continue;
                }
                let weight = ctx.rng.synthesize_weight(ex_weight.0, ex_weight.1, normal);
                ctx.connect(pre.id, post.id, weight)?;
            }

            for post in ctx.neurons_in(destination, square_around(&pre, in_radius))? {
                if post.id == pre.id {
                    continue;
                }
                let d = planar_distance(pre.position, post.position);
                if d < inner_ring
                    || d > in_radius
                    || !ctx.rng.radial_probability(in_radius, d, in_density)
                {
                    continue;
                }
                let weight = ctx.rng.synthesize_weight(in_weight.0, in_weight.1, normal);
                ctx.connect(pre.id, post.id, weight)?;
            }

            done += 1;
            ctx.progress.set_progress(done);
        }

        Ok(ctx.finish(false))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{layer, run};
    use super::*;
    use crate::params::ParameterMap;
    use crate::registry::{ConnectionType, ConnectionTypeRegistry, StandardRegistry};
    use std::collections::HashSet;
    use synthnet_storage::{ConnectionGroupId, MemoryStore, NetworkStore};

    fn params(ex_radius: f64, in_radius: f64, in_density: f64) -> ParameterMap {
        let mut p = StandardRegistry.parameters(ConnectionType::SimpleCortex);
        p.insert("Excitation radius", ex_radius);
        p.insert("Excitation density", 1.0);
        p.insert("Excitation weight range", 0.0);
        p.insert("Inhibition radius", in_radius);
        p.insert("Inhibition density", in_density);
        p.insert("Inhibition weight range", 0.0);
        p
    }

    #[test]
    fn test_no_self_or_duplicate_connections() {
        let mut store = MemoryStore::new();
        let g = layer(&mut store, (0, 0, 0), 8, 8);
        let outcome = run(&SimpleCortex, &mut store, &g, &g, &params(2.0, 4.0, 1.0)).unwrap();
        assert!(outcome.connections > 0);

        let conns = store.connections(ConnectionGroupId::new(1)).unwrap();
        assert_eq!(conns.len() as u64, outcome.connections);
        let mut pairs = HashSet::new();
        for c in &conns {
            assert_ne!(c.pre, c.post);
            assert!(pairs.insert((c.pre, c.post)));
        }
    }

    #[test]
    fn test_nearest_neighbours_are_excitatory() {
        let mut store = MemoryStore::new();
        let g = layer(&mut store, (0, 0, 0), 5, 5);
        // radius 1 with density 1 always accepts distance 1
        run(&SimpleCortex, &mut store, &g, &g, &params(1.0, 0.0, 0.0)).unwrap();

        let conns = store.connections(ConnectionGroupId::new(1)).unwrap();
        // 5x5 grid has 2 * 5 * 4 adjacent pairs, each wired both ways
        assert_eq!(conns.len(), 80);
        assert!(conns.iter().all(|c| c.weight == 102));
    }

    #[test]
    fn test_inhibition_respects_inner_ring() {
        let mut store = MemoryStore::new();
        let g = layer(&mut store, (0, 0, 0), 1, 9);
        let outcome = run(&SimpleCortex, &mut store, &g, &g, &params(0.0, 8.0, 0.0)).unwrap();
        assert_eq!(outcome.connections, 0);

        let mut store = MemoryStore::new();
        let g = layer(&mut store, (0, 0, 0), 1, 3);
        run(&SimpleCortex, &mut store, &g, &g, &params(0.5, 1.0, 1.0)).unwrap();
        let conns = store.connections(ConnectionGroupId::new(1)).unwrap();
        assert_eq!(conns.len(), 4);
        assert!(conns.iter().all(|c| c.weight == -102));
    }
}
