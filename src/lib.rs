//! # mincost-surface
//!
//! Minimum-cost surface and curve extraction from scalar cost volumes via
//! a single min-cut / max-flow computation.
//!
//! A cost volume is a dense D-dimensional array (D = 2 for a curve in an
//! image, D = 3 for a surface in a volume) whose last axis is the
//! *altitude* axis. The crate finds, for each base-grid position, the
//! altitude of a surface that minimizes the accumulated cost, subject to:
//!
//! - **Monotonicity**: exactly one transition per altitude column.
//! - **Smoothness**: the height difference between laterally adjacent
//!   base positions is bounded by `max_delta`.
//! - **Ordering** (optional, multi-surface): coupled surfaces keep a
//!   prescribed vertical separation range and never cross.
//!
//! The constrained optimization is encoded exactly into a flow network —
//! one node per voxel, infinite arcs for the hard constraints, telescoped
//! cost differences as terminal capacities — and solved with one max-flow
//! computation; the minimum cut corresponds bijectively to the optimal
//! height function.
//!
//! ## Quick start
//!
//! ```
//! use mincost_surface::prelude::*;
//! use ndarray::Array2;
//!
//! // A 4-column cost image, altitude axis last, with a cheap run at
//! // altitude 2. Detect the cheapest curve with |Δh| <= 1 between
//! // neighboring columns.
//! let mut cost = Array2::<f32>::ones((4, 5));
//! for x in 0..4 {
//!     cost[[x, 2]] = 0.1;
//! }
//!
//! let mut builder = SurfaceGraphBuilder::for_curves();
//! let curve = builder.add_surface(cost.view(), 1, 1.0)?;
//! let solution = builder.solve()?;
//!
//! let heights = solution.height_map(curve)?;
//! assert_eq!(heights.shape(), &[4]);
//! # Ok::<(), mincost_surface::SurfaceError>(())
//! ```
//!
//! ## Coupled surfaces
//!
//! Register several surfaces over the same volume, then bound their
//! separation with
//! [`add_separation_constraint`](SurfaceGraphBuilder::add_separation_constraint);
//! all surfaces are solved jointly in one cut.
//!
//! ## Modules
//!
//! - [`builder`]: graph construction and the solve entry point
//! - [`solution`]: solved results, height-map and mask decoding
//! - [`solver`]: the max-flow solver interface and the bundled default
//! - [`constraint`]: inter-surface ordering arcs
//! - [`tile`]: banded multi-threaded orchestration
//! - [`resample`]: down/up-sampling and height-map reslicing
//! - [`pipeline`]: end-to-end detection runs mirroring common use cases
//! - [`graph`], [`volume`]: node addressing and volume geometry
//! - [`error`]: the error type

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod constraint;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod resample;
pub mod solution;
pub mod solver;
pub mod tile;
pub mod volume;

pub use builder::SurfaceGraphBuilder;
pub use constraint::{ConstraintSet, SeparationSpec};
pub use error::{Result, SurfaceError};
pub use graph::{
    GraphArc, GraphStats, NodeId, NodeSpace, SurfaceGraph, SurfaceId, TerminalWeights, Weight,
    INFINITE_WEIGHT,
};
pub use pipeline::{
    detect_curve, detect_surface, detect_surface_tiled, detect_two_surfaces,
    detect_two_surfaces_tiled, DetectionConfig, TwoSurfaceConfig,
};
pub use resample::{downsample, reslice_along_height_map, upsample, upsample_to, Interpolator};
pub use solution::CutSolution;
pub use solver::{DinicSolver, MaxFlowSolver, Terminal};
pub use tile::{band_tasks, solve_tile, solve_tiled, SurfaceSpec, TileTask, TilingConfig};
pub use volume::{Cost, VolumeShape};

/// Commonly used types and entry points
pub mod prelude {
    pub use crate::builder::SurfaceGraphBuilder;
    pub use crate::error::{Result, SurfaceError};
    pub use crate::graph::{SurfaceId, INFINITE_WEIGHT};
    pub use crate::pipeline::{
        detect_curve, detect_surface, detect_surface_tiled, detect_two_surfaces,
        detect_two_surfaces_tiled, DetectionConfig, TwoSurfaceConfig,
    };
    pub use crate::resample::Interpolator;
    pub use crate::solution::CutSolution;
    pub use crate::solver::{DinicSolver, MaxFlowSolver, Terminal};
    pub use crate::tile::{solve_tiled, SurfaceSpec, TilingConfig};
    pub use crate::volume::{Cost, VolumeShape};
}
