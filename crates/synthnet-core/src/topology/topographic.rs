//! Topographic (map-preserving) wiring

use super::{lattice_coords, Recipe, RecipeContext, RecipeOutcome};
use crate::error::{BuildError, Result};

use log::debug;
use synthnet_storage::{NeuronCursor, NeuronQuery};

/// Maps the source lattice onto the destination lattice.
///
/// Equal shapes with no overlap pair neurons one-to-one in id order.
/// Otherwise each axis gets an integer scale factor (larger over smaller
/// extent) and every source neuron connects to the destination rectangle its
/// lattice cell maps to, widened by `Overlap` cells on each side.
#[derive(Debug, Clone, Copy, Default)]
pub struct Topographic;

const PARAMETERS: &[&str] = &[
    "Overlap",
    "Rotate",
    "Average weight",
    "Weight range",
    "Normal weight distribution",
];

/// How one source axis maps onto one destination axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisMap {
    /// `ratio` source cells share one destination cell
    Shrink(i64),
    /// one source cell spans `ratio` destination cells
    Expand(i64),
}

impl AxisMap {
    fn between(source: u32, destination: u32) -> Self {
        let (s, d) = (i64::from(source), i64::from(destination));
        if s >= d {
            Self::Shrink(s / d)
        } else {
            Self::Expand(d / s)
        }
    }

    /// Half-open destination cell range for a source cell
    fn span(self, index: u32, overlap: i64) -> (i64, i64) {
        let i = i64::from(index);
        let (start, end) = match self {
            Self::Shrink(ratio) => (i / ratio, i / ratio + 1),
            Self::Expand(ratio) => (i * ratio, (i + 1) * ratio),
        };
        (start - overlap, end + overlap)
    }
}

fn coord(origin: i32, cell: i64, spacing: i64) -> Result<i32> {
    let value = i64::from(origin) + cell * spacing;
    i32::try_from(value).map_err(|_| {
        BuildError::invalid_parameters(format!("mapped coordinate {} out of range", value))
    })
}

impl Topographic {
    fn lockstep(
        &self,
        ctx: &mut RecipeContext<'_>,
        weight: (f64, f64),
        normal: bool,
    ) -> Result<RecipeOutcome> {
        let (source, destination) = (ctx.source, ctx.destination);
        let mut pre_cursor = NeuronCursor::new(source.id);
        let mut post_cursor = NeuronCursor::new(destination.id);
        let mut done = 0u64;
        loop {
            let pre = pre_cursor.next_neuron(&*ctx.store)?;
            let post = post_cursor.next_neuron(&*ctx.store)?;
            let (pre, post) = match (pre, post) {
                (Some(pre), Some(post)) => (pre, post),
                (None, None) => break,
                _ => {
                    return Err(BuildError::geometry(format!(
                        "groups {} and {} share a shape but hold different neuron counts",
                        source.id, destination.id
                    )))
                }
            };
            if ctx.cancelled() {
                return Ok(ctx.finish(true));
            }
            let w = ctx.rng.synthesize_weight(weight.0, weight.1, normal);
            ctx.connect(pre.id, post.id, w)?;
            done += 1;
            ctx.progress.set_progress(done);
        }
        Ok(ctx.finish(false))
    }
}

impl Recipe for Topographic {
    fn name(&self) -> &'static str {
        "Topographic"
    }

    fn required_parameters(&self) -> &'static [&'static str] {
        PARAMETERS
    }

    fn execute(&self, ctx: &mut RecipeContext<'_>) -> Result<RecipeOutcome> {
        let p = ctx.parameters;
        let overlap = p.integer("Overlap")?;
        let rotate = p.flag("Rotate")?;
        let weight = (p.get("Average weight")?, p.get("Weight range")?);
        let normal = p.flag("Normal weight distribution")?;

        let (source, destination) = (ctx.source, ctx.destination);
        ctx.begin(self.name(), source.neuron_count());

        if source.width == destination.width
            && source.length == destination.length
            && overlap == 0
        {
            debug!("Topographic {} -> {}: one-to-one", source.id, destination.id);
            return self.lockstep(ctx, weight, normal);
        }

        // destination extents along the source x and y axes
        let (dest_for_x, dest_for_y) = if rotate {
            (destination.length, destination.width)
        } else {
            (destination.width, destination.length)
        };
        let map_x = AxisMap::between(source.width, dest_for_x);
        let map_y = AxisMap::between(source.length, dest_for_y);
        debug!(
            "Topographic {} -> {}: x {:?}, y {:?}, overlap {}, rotate {}",
            source.id, destination.id, map_x, map_y, overlap, rotate
        );

        let spacing = i64::from(destination.spacing);
        let mut cursor = NeuronCursor::new(source.id);
        let mut done = 0u64;
        while let Some(pre) = cursor.next_neuron(&*ctx.store)? {
            if ctx.cancelled() {
                return Ok(ctx.finish(true));
            }
            let (col, row) = lattice_coords(source, &pre)?;
            let along_x = map_x.span(col, overlap);
            let along_y = map_y.span(row, overlap);
            let (cols, rows) = if rotate { (along_y, along_x) } else { (along_x, along_y) };

            let area = NeuronQuery::anywhere()
                .x_range(
                    coord(destination.position.x, cols.0, spacing)?,
                    coord(destination.position.x, cols.1, spacing)?,
                )
                .y_range(
                    coord(destination.position.y, rows.0, spacing)?,
                    coord(destination.position.y, rows.1, spacing)?,
                );
            for post in ctx.neurons_in(destination, area)? {
                let w = ctx.rng.synthesize_weight(weight.0, weight.1, normal);
                ctx.connect(pre.id, post.id, w)?;
            }

            done += 1;
            ctx.progress.set_progress(done);
        }

        Ok(ctx.finish(false))
    }
}
