//! Center/surround receptive fields

use super::{lattice_coords, Recipe, RecipeContext, RecipeOutcome};
use crate::error::{BuildError, Result};
use crate::params::ParameterMap;

use log::{debug, warn};
use std::collections::HashMap;
use synthnet_storage::{NeuronCursor, NeuronId, NeuronQuery};

/// Which part of the field excites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurroundPolarity {
    /// Excitatory center, inhibitory surround
    OnCenter,
    /// Inhibitory center, excitatory surround
    OffCenter,
}

/// Tiles the source group with `outer` windows, one per destination neuron.
///
/// Window `(c, r)` starts at source lattice `(c * (outer width - overlap),
/// r * (outer length - overlap))`. Source neurons inside the centered inner
/// rectangle get the center weight, the rest of the window the surround
/// weight.
#[derive(Debug, Clone, Copy)]
pub struct CenterSurround {
    polarity: SurroundPolarity,
}

impl CenterSurround {
    /// Recipe for the given polarity
    pub const fn new(polarity: SurroundPolarity) -> Self {
        Self { polarity }
    }
}

const PARAMETERS: &[&str] = &[
    "Outer width",
    "Outer length",
    "Inner width",
    "Inner length",
    "Overlap",
    "Rotate",
    "Excitation weight",
    "Excitation weight range",
    "Inhibition weight",
    "Inhibition weight range",
    "Normal weight distribution",
];

struct Field {
    outer: (i64, i64),
    inner: (i64, i64),
    overlap: i64,
    rotate: bool,
    excitation: (f64, f64),
    inhibition: (f64, f64),
    normal: bool,
}

impl Field {
    fn from_parameters(p: &ParameterMap) -> Result<Self> {
        let field = Self {
            outer: (p.integer("Outer width")?, p.integer("Outer length")?),
            inner: (p.integer("Inner width")?, p.integer("Inner length")?),
            overlap: p.integer("Overlap")?,
            rotate: p.flag("Rotate")?,
            excitation: (p.get("Excitation weight")?, p.get("Excitation weight range")?),
            inhibition: (p.get("Inhibition weight")?, p.get("Inhibition weight range")?),
            normal: p.flag("Normal weight distribution")?,
        };
        if field.outer.0 < 1 || field.outer.1 < 1 {
            return Err(BuildError::invalid_parameters("outer field must be at least 1x1"));
        }
        if field.inner.0 < 0
            || field.inner.1 < 0
            || field.inner.0 > field.outer.0
            || field.inner.1 > field.outer.1
        {
            return Err(BuildError::invalid_parameters(
                "inner field must fit inside the outer field",
            ));
        }
        if field.overlap >= field.outer.0 || field.overlap >= field.outer.1 {
            return Err(BuildError::invalid_parameters(
                "overlap must be smaller than the outer field",
            ));
        }
        Ok(field)
    }

    fn step(&self) -> (i64, i64) {
        (self.outer.0 - self.overlap, self.outer.1 - self.overlap)
    }

    fn inner_offset(&self) -> (i64, i64) {
        ((self.outer.0 - self.inner.0) / 2, (self.outer.1 - self.inner.1) / 2)
    }

    fn in_center(&self, col: i64, row: i64) -> bool {
        let (ox, oy) = self.inner_offset();
        col >= ox && col < ox + self.inner.0 && row >= oy && row < oy + self.inner.1
    }
}

fn coord(value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        BuildError::invalid_parameters(format!("window coordinate {} out of range", value))
    })
}

impl Recipe for CenterSurround {
    fn name(&self) -> &'static str {
        match self.polarity {
            SurroundPolarity::OnCenter => "On center off surround",
            SurroundPolarity::OffCenter => "Off center on surround",
        }
    }

    fn required_parameters(&self) -> &'static [&'static str] {
        PARAMETERS
    }

    fn execute(&self, ctx: &mut RecipeContext<'_>) -> Result<RecipeOutcome> {
        if self.polarity == SurroundPolarity::OffCenter {
            return Err(BuildError::UnimplementedTopology { name: self.name() });
        }
        let field = Field::from_parameters(ctx.parameters)?;
        let (source, destination) = (ctx.source, ctx.destination);
        let spacing = i64::from(source.spacing);
        let (step_x, step_y) = field.step();
        let track_coverage = field.overlap == 0;
        let mut coverage: HashMap<NeuronId, u32> = HashMap::new();

        ctx.begin(self.name(), destination.neuron_count());
        debug!(
            "Center/surround {} -> {}: outer {:?}, inner {:?}, overlap {}, rotate {}",
            source.id, destination.id, field.outer, field.inner, field.overlap, field.rotate
        );

        let mut cursor = NeuronCursor::new(destination.id);
        let mut done = 0u64;
        let mut cancelled = false;
        while let Some(post) = cursor.next_neuron(&*ctx.store)? {
            if ctx.cancelled() {
                cancelled = true;
                break;
            }
            let (col, row) = lattice_coords(destination, &post)?;
            let (a, b) = if field.rotate { (row, col) } else { (col, row) };
            let start_col = i64::from(a) * step_x;
            let start_row = i64::from(b) * step_y;
            let x0 = i64::from(source.position.x) + start_col * spacing;
            let y0 = i64::from(source.position.y) + start_row * spacing;
            let window = NeuronQuery::anywhere()
                .x_range(coord(x0)?, coord(x0 + field.outer.0 * spacing)?)
                .y_range(coord(y0)?, coord(y0 + field.outer.1 * spacing)?);

            for pre in ctx.neurons_in(source, window)? {
                let (sc, sr) = lattice_coords(source, &pre)?;
                let centered =
                    field.in_center(i64::from(sc) - start_col, i64::from(sr) - start_row);
                let (w, range) = if centered {
                    field.excitation
                } else {
                    field.inhibition
                };
                let weight = ctx.rng.synthesize_weight(w, range, field.normal);
                ctx.connect(pre.id, post.id, weight)?;
                if track_coverage {
                    *coverage.entry(pre.id).or_default() += 1;
                }
            }

            done += 1;
            ctx.progress.set_progress(done);
        }

        if track_coverage && !cancelled {
            let mut misses = 0u64;
            let mut total = 0u64;
            let mut cursor = NeuronCursor::new(source.id);
            while let Some(pre) = cursor.next_neuron(&*ctx.store)? {
                total += 1;
                if coverage.get(&pre.id).copied().unwrap_or(0) != 1 {
                    misses += 1;
                }
            }
            if misses > 0 {
                warn!(
                    "{} of {} neurons in {} were not covered by exactly one field of {}",
                    misses, total, source.id, destination.id
                );
            }
        }

        Ok(ctx.finish(cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{layer, run};
    use super::*;
    use crate::registry::{ConnectionType, ConnectionTypeRegistry, StandardRegistry};
    use synthnet_storage::{ConnectionGroupId, MemoryStore, NetworkStore};

    fn params() -> ParameterMap {
        let mut p = StandardRegistry.parameters(ConnectionType::OnCenterOffSurround);
        p.insert("Excitation weight range", 0.0);
        p.insert("Inhibition weight range", 0.0);
        p
    }

    #[test]
    fn test_tiles_cover_source_once() {
        let mut store = MemoryStore::new();
        let src = layer(&mut store, (0, 0, 0), 6, 6);
        let dst = layer(&mut store, (0, 0, 1), 2, 2);

        let recipe = CenterSurround::new(SurroundPolarity::OnCenter);
        let outcome = run(&recipe, &mut store, &src, &dst, &params()).unwrap();
        assert_eq!(outcome.connections, 36);
        assert!(!outcome.cancelled);

        let conns = store.connections(ConnectionGroupId::new(1)).unwrap();
        let excitatory: Vec<_> = conns.iter().filter(|c| c.weight > 0).collect();
        assert_eq!(excitatory.len(), 4);
        assert!(excitatory.iter().all(|c| c.weight == 102));
        assert!(conns.iter().filter(|c| c.weight < 0).all(|c| c.weight == -64));

        // each source neuron appears once
        let mut pres: Vec<_> = conns.iter().map(|c| c.pre).collect();
        pres.sort();
        pres.dedup();
        assert_eq!(pres.len(), 36);
    }

    #[test]
    fn test_center_is_middle_of_window() {
        let mut store = MemoryStore::new();
        let src = layer(&mut store, (0, 0, 0), 3, 3);
        let dst = layer(&mut store, (0, 0, 1), 1, 1);

        let recipe = CenterSurround::new(SurroundPolarity::OnCenter);
        run(&recipe, &mut store, &src, &dst, &params()).unwrap();

        let center = store
            .find_neurons(&NeuronQuery::at(src.id, synthnet_storage::Position::new(1, 1, 0)))
            .unwrap()[0];
        let conns = store.connections(ConnectionGroupId::new(1)).unwrap();
        for c in conns {
            assert_eq!(c.weight > 0, c.pre == center.id);
        }
    }

    #[test]
    fn test_rotate_swaps_axes() {
        let mut store = MemoryStore::new();
        let src = layer(&mut store, (0, 0, 0), 6, 3);
        let dst = layer(&mut store, (0, 0, 1), 1, 2);

        let mut p = params();
        p.insert("Rotate", 1.0);
        let recipe = CenterSurround::new(SurroundPolarity::OnCenter);
        let outcome = run(&recipe, &mut store, &src, &dst, &p).unwrap();
        assert_eq!(outcome.connections, 18);
    }

    #[test]
    fn test_off_center_is_unimplemented() {
        let mut store = MemoryStore::new();
        let src = layer(&mut store, (0, 0, 0), 3, 3);
        let dst = layer(&mut store, (0, 0, 1), 1, 1);

        let recipe = CenterSurround::new(SurroundPolarity::OffCenter);
        let err = run(&recipe, &mut store, &src, &dst, &params()).unwrap_err();
        assert!(matches!(err, BuildError::UnimplementedTopology { .. }));
        assert_eq!(store.total_connections(), 0);
    }

    #[test]
    fn test_rejects_inner_larger_than_outer() {
        let mut store = MemoryStore::new();
        let src = layer(&mut store, (0, 0, 0), 3, 3);
        let dst = layer(&mut store, (0, 0, 1), 1, 1);

        let mut p = params();
        p.insert("Inner width", 4.0);
        let recipe = CenterSurround::new(SurroundPolarity::OnCenter);
        assert!(matches!(
            run(&recipe, &mut store, &src, &dst, &p),
            Err(BuildError::InvalidParameters { .. })
        ));
    }
}
