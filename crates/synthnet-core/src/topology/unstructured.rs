//! Random wiring at a fixed density

use super::{contiguous_ids, Recipe, RecipeContext, RecipeOutcome};
use crate::error::Result;

use log::debug;
use synthnet_storage::{NeuronCursor, NeuronId};

/// Every (source, destination) pair is connected with probability
/// `Connection density`. Destination neurons are addressed by id, so the
/// destination group's ids must be contiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unstructured;

const PARAMETERS: &[&str] = &[
    "Connection density",
    "Average weight",
    "Weight range",
    "Normal weight distribution",
];

impl Recipe for Unstructured {
    fn name(&self) -> &'static str {
        "Unstructured"
    }

    fn required_parameters(&self) -> &'static [&'static str] {
        PARAMETERS
    }

    fn execute(&self, ctx: &mut RecipeContext<'_>) -> Result<RecipeOutcome> {
        let p = ctx.parameters;
        let density = p.get("Connection density")?;
        let weight = (p.get("Average weight")?, p.get("Weight range")?);
        let normal = p.flag("Normal weight distribution")?;

        let (source, destination) = (ctx.source, ctx.destination);
        let (first, last) = contiguous_ids(&*ctx.store, destination)?;
        let expected = source.neuron_count() as f64
            * density.clamp(0.0, 1.0)
            * destination.neuron_count() as f64;
        ctx.begin(self.name(), expected.round() as u64);
        debug!(
            "Unstructured {} -> {}: density {}, destination ids {}..={}",
            source.id, destination.id, density, first, last
        );

        let mut cursor = NeuronCursor::new(source.id);
        while let Some(pre) = cursor.next_neuron(&*ctx.store)? {
            if ctx.cancelled() {
                return Ok(ctx.finish(true));
            }
            for raw in first.raw()..=last.raw() {
                if !ctx.rng.bernoulli(density) || raw == pre.id.raw() {
                    continue;
                }
                let w = ctx.rng.synthesize_weight(weight.0, weight.1, normal);
                ctx.connect(pre.id, NeuronId::new(raw), w)?;
            }
            let made = ctx.connections();
            ctx.progress.set_progress(made);
        }

        Ok(ctx.finish(false))
    }
}
