//! Random wiring with excitatory and inhibitory source populations

use super::{contiguous_ids, Recipe, RecipeContext, RecipeOutcome};
use crate::error::{BuildError, Result};

use log::debug;
use synthnet_storage::{Neuron, NeuronCursor, NeuronId};

/// Like [`Unstructured`](super::Unstructured), but each source neuron is
/// either excitatory or inhibitory and uses that class's probability and
/// weight.
///
/// A neuron that already has outgoing connections keeps the sign of its
/// existing weights. A neuron with none is drawn excitatory with probability
/// `Excitatory percentage / 100`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnstructuredExInhib;

const PARAMETERS: &[&str] = &[
    "Excitatory percentage",
    "Excitation connection prob",
    "Excitation weight",
    "Excitation weight range",
    "Inhibition connection prob",
    "Inhibition weight",
    "Inhibition weight range",
    "Normal weight distribution",
];

fn is_excitatory(ctx: &mut RecipeContext<'_>, neuron: &Neuron, percentage: f64) -> Result<bool> {
    let weights = ctx.store.outgoing_weights(neuron.id)?;
    let positive = weights.iter().any(|&w| w > 0);
    let negative = weights.iter().any(|&w| w < 0);
    match (positive, negative) {
        (true, true) => Err(BuildError::MixedPolarity { neuron: neuron.id }),
        (true, false) => Ok(true),
        (false, true) => Ok(false),
        (false, false) => Ok(ctx.rng.bernoulli(percentage / 100.0)),
    }
}

impl Recipe for UnstructuredExInhib {
    fn name(&self) -> &'static str {
        "Unstructured excitatory inhibitory"
    }

    fn required_parameters(&self) -> &'static [&'static str] {
        PARAMETERS
    }

    fn execute(&self, ctx: &mut RecipeContext<'_>) -> Result<RecipeOutcome> {
        let p = ctx.parameters;
        let percentage = p.get("Excitatory percentage")?;
        let excitation = (
            p.get("Excitation connection prob")?,
            p.get("Excitation weight")?,
            p.get("Excitation weight range")?,
        );
        let inhibition = (
            p.get("Inhibition connection prob")?,
            p.get("Inhibition weight")?,
            p.get("Inhibition weight range")?,
        );
        let normal = p.flag("Normal weight distribution")?;

        let (source, destination) = (ctx.source, ctx.destination);
        let (first, last) = contiguous_ids(&*ctx.store, destination)?;
        ctx.begin(self.name(), source.neuron_count());
        debug!(
            "Unstructured ex/inhib {} -> {}: {}% excitatory",
            source.id, destination.id, percentage
        );

        let mut cursor = NeuronCursor::new(source.id);
        let mut done = 0u64;
        while let Some(pre) = cursor.next_neuron(&*ctx.store)? {
            if ctx.cancelled() {
                return Ok(ctx.finish(true));
            }
            let (prob, weight, range) = if is_excitatory(ctx, &pre, percentage)? {
                excitation
            } else {
                inhibition
            };
            for raw in first.raw()..=last.raw() {
                if !ctx.rng.bernoulli(prob) || raw == pre.id.raw() {
                    continue;
                }
                let w = ctx.rng.synthesize_weight(weight, range, normal);
                ctx.connect(pre.id, NeuronId::new(raw), w)?;
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
    use std::collections::HashMap;
    use synthnet_storage::{Connection, ConnectionGroupId, MemoryStore, NetworkStore};

    fn params(percentage: f64) -> ParameterMap {
        StandardRegistry
            .parameters(ConnectionType::UnstructuredExInhib)
            .with("Excitatory percentage", percentage)
            .with("Excitation connection prob", 1.0)
            .with("Inhibition connection prob", 1.0)
    }

    #[test]
    fn test_each_source_has_one_sign() {
        let mut store = MemoryStore::new();
        let a = layer(&mut store, (0, 0, 0), 5, 5);
        let b = layer(&mut store, (0, 0, 1), 5, 5);
        run(&UnstructuredExInhib, &mut store, &a, &b, &params(50.0)).unwrap();

        let mut signs: HashMap<NeuronId, (bool, bool)> = HashMap::new();
        for c in store.connections(ConnectionGroupId::new(1)).unwrap() {
            let entry = signs.entry(c.pre).or_default();
            entry.0 |= c.weight > 0;
            entry.1 |= c.weight < 0;
        }
        assert_eq!(signs.len(), 25);
        assert!(signs.values().all(|&(pos, neg)| pos != neg));
    }

    #[test]
    fn test_existing_sign_is_kept() {
        let mut store = MemoryStore::new();
        let a = layer(&mut store, (0, 0, 0), 1, 1);
        let b = layer(&mut store, (0, 0, 1), 3, 1);
        let c = layer(&mut store, (0, 0, 2), 3, 1);
        let (pre, _) = store.neuron_id_range(a.id).unwrap().unwrap();
        let (other, _) = store.neuron_id_range(c.id).unwrap().unwrap();
        store
            .insert_connection(&Connection {
                pre,
                post: other,
                delay: 1,
                weight: -20,
                group: ConnectionGroupId::new(9),
            })
            .unwrap();

        // every fresh neuron would be excitatory, but this one is already inhibitory
        run(&UnstructuredExInhib, &mut store, &a, &b, &params(100.0)).unwrap();
        let conns = store.connections(ConnectionGroupId::new(1)).unwrap();
        assert_eq!(conns.len(), 3);
        assert!(conns.iter().all(|c| c.weight < 0));
    }

    #[test]
    fn test_mixed_polarity_is_fatal() {
        let mut store = MemoryStore::new();
        let a = layer(&mut store, (0, 0, 0), 1, 1);
        let b = layer(&mut store, (0, 0, 1), 2, 1);
        let (pre, _) = store.neuron_id_range(a.id).unwrap().unwrap();
        let (p0, p1) = store.neuron_id_range(b.id).unwrap().unwrap();
        for (post, weight) in [(p0, 10), (p1, -10)] {
            store
                .insert_connection(&Connection {
                    pre,
                    post,
                    delay: 1,
                    weight,
                    group: ConnectionGroupId::new(9),
                })
                .unwrap();
        }

        let err = run(&UnstructuredExInhib, &mut store, &a, &b, &params(50.0)).unwrap_err();
        assert!(matches!(err, BuildError::MixedPolarity { neuron } if neuron == pre));
    }
}
