//! Tiled, multi-threaded surface extraction
//!
//! Large volumes are partitioned into contiguous bands along the last base
//! axis; every band runs the full build-solve-decode pipeline as an
//! independent, pure [`solve_tile`] call, dispatched through a fork-join
//! parallel map. The per-band height maps are stitched into global maps
//! after the join.
//!
//! No constraint arcs cross band boundaries, so the smoothness bound is
//! not enforced between the last row of one band and the first row of the
//! next. This trades boundary continuity for parallel speedup and is part
//! of the contract, not an accident: callers who need seam-free results
//! must solve in one tile.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::builder::SurfaceGraphBuilder;
use crate::error::{Result, SurfaceError};
use crate::graph::SurfaceId;
use crate::volume::{Cost, VolumeShape};

/// One band of the partition along the band axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileTask {
    /// First index of the band along the band axis
    pub offset: usize,
    /// Number of indices the band covers
    pub extent: usize,
}

/// Parameters of one surface within a tiled problem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
    /// Maximum altitude change between lateral neighbors
    pub max_delta: usize,
    /// Positive cost multiplier for this surface
    pub weight_factor: f32,
}

impl Default for SurfaceSpec {
    fn default() -> Self {
        Self {
            max_delta: 1,
            weight_factor: 1.0,
        }
    }
}

/// Full description of a tiled extraction problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilingConfig {
    /// Number of bands to partition the volume into
    pub tile_count: usize,
    /// Surfaces to extract, all sharing the tile's cost volume
    pub surfaces: Vec<SurfaceSpec>,
    /// Ordering constraints between the surfaces (1-based ids)
    pub separations: Vec<crate::constraint::SeparationSpec>,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            tile_count: 1,
            surfaces: vec![SurfaceSpec::default()],
            separations: Vec::new(),
        }
    }
}

/// Partition a band axis of length `band_len` into contiguous tiles
///
/// The tile count is clamped to `[1, band_len]`; all tiles get
/// `band_len / tiles` indices except the last, which absorbs the
/// remainder.
pub fn band_tasks(band_len: usize, tile_count: usize) -> Vec<TileTask> {
    let tiles = tile_count.clamp(1, band_len.max(1));
    let unit = band_len / tiles;
    (0..tiles)
        .map(|i| TileTask {
            offset: i * unit,
            extent: if i + 1 == tiles {
                band_len - i * unit
            } else {
                unit
            },
        })
        .collect()
}

/// Run the full pipeline on one tile of a cost volume
///
/// Pure function of the tile's sub-volume and the configuration; returns
/// one height map per configured surface, in surface order.
pub fn solve_tile(cost: ArrayViewD<'_, Cost>, config: &TilingConfig) -> Result<Vec<ArrayD<f32>>> {
    if config.surfaces.is_empty() {
        return Err(SurfaceError::EmptyProblem);
    }
    let mut builder = SurfaceGraphBuilder::for_ndim(cost.ndim())?;
    for spec in &config.surfaces {
        builder.add_surface(cost.view(), spec.max_delta, spec.weight_factor)?;
    }
    for sep in &config.separations {
        builder.add_separation_constraint(sep.lower, sep.upper, sep.min_dist, sep.max_dist)?;
    }
    let solution = builder.solve()?;
    (1..=config.surfaces.len() as SurfaceId)
        .map(|surface| solution.height_map(surface))
        .collect()
}

/// Extract surfaces from a volume band-by-band on parallel workers
///
/// Partitions the volume into `config.tile_count` bands along the last
/// base axis, solves every band independently (see the module notes on
/// boundary continuity), and stitches the per-band height maps into one
/// global map per surface. Blocks until every band is done.
pub fn solve_tiled(cost: ArrayViewD<'_, Cost>, config: &TilingConfig) -> Result<Vec<ArrayD<f32>>> {
    if config.surfaces.is_empty() {
        return Err(SurfaceError::EmptyProblem);
    }
    let shape = VolumeShape::new(cost.shape())?;
    let band_axis = Axis(shape.ndim() - 2);
    let band_len = shape.dims()[shape.ndim() - 2];
    let tasks = band_tasks(band_len, config.tile_count);

    let partials: Vec<Vec<ArrayD<f32>>> = tasks
        .par_iter()
        .map(|task| {
            trace!(offset = task.offset, extent = task.extent, "solving tile");
            let band = cost.slice_axis(
                band_axis,
                Slice::from(task.offset..task.offset + task.extent),
            );
            solve_tile(band, config)
        })
        .collect::<Result<_>>()?;

    let mut outputs =
        vec![ArrayD::<f32>::zeros(IxDyn(shape.base_dims())); config.surfaces.len()];
    for (task, maps) in tasks.iter().zip(partials) {
        for (output, map) in outputs.iter_mut().zip(maps) {
            output
                .slice_axis_mut(
                    band_axis,
                    Slice::from(task.offset..task.offset + task.extent),
                )
                .assign(&map);
        }
    }
    Ok(outputs)
}
