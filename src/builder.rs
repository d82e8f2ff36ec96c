//! Surface graph construction and solving
//!
//! [`SurfaceGraphBuilder`] accumulates one graph per surface plus
//! inter-surface ordering constraints, then assembles everything into a
//! single max-flow problem. Building is append-only and solving borrows
//! the builder immutably: every [`solve`](SurfaceGraphBuilder::solve)
//! yields an independent, frozen [`CutSolution`], so results can never be
//! invalidated by later mutation.
//!
//! # Graph encoding
//!
//! Per voxel `(p, a)` of a surface (base position `p`, altitude `a`):
//!
//! - `a == 0`: no arcs; the node is pinned to the source with an infinite
//!   terminal capacity. The base of a column can never be excluded.
//! - `0 < a <= max_delta`: one infinite monotonicity arc to the voxel
//!   directly below. Cutting between `a` and `a - 1` stays possible, but
//!   a sink-side voxel below a source-side voxel is not.
//! - `a > max_delta`: the monotonicity arc, plus one infinite smoothness
//!   arc per in-bounds lateral neighbor, targeting that neighbor's column
//!   at altitude `a - max_delta`. A height step larger than `max_delta`
//!   would have to cut one of these.
//!
//! The terminal capacity carries the telescoped cost difference
//! `w = weight_factor * (cost(p, a) - cost(p, a - 1))`, split by sign:
//! negative toward the source, positive toward the sink. Summed along a
//! column prefix the differences collapse, so each feasible cut pays the
//! cost of exactly the voxels it selects.

use std::time::Instant;

use ndarray::{ArrayView, ArrayViewD, Dimension};
use roaring::RoaringBitmap;
use tracing::debug;

use crate::constraint::{separation_arcs, ConstraintSet, SeparationSpec};
use crate::error::{Result, SurfaceError};
use crate::graph::{
    GraphArc, GraphStats, NodeSpace, SurfaceGraph, SurfaceId, TerminalWeights, Weight,
    INFINITE_WEIGHT,
};
use crate::solution::CutSolution;
use crate::solver::{DinicSolver, MaxFlowSolver, Terminal};
use crate::volume::{Cost, VolumeShape};

/// Accumulates surface graphs and constraints, and runs the solve
///
/// Created for a fixed volume dimensionality (2 = curves in images,
/// 3 = surfaces in volumes); every registered cost volume must match it,
/// and all volumes must share one shape.
#[derive(Debug)]
pub struct SurfaceGraphBuilder {
    expected_ndim: usize,
    shape: Option<VolumeShape>,
    surfaces: Vec<SurfaceGraph>,
    constraints: Vec<ConstraintSet>,
}

impl SurfaceGraphBuilder {
    fn with_ndim(ndim: usize) -> Self {
        Self {
            expected_ndim: ndim,
            shape: None,
            surfaces: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Builder for curves in 2-dimensional cost images
    pub fn for_curves() -> Self {
        Self::with_ndim(2)
    }

    /// Builder for surfaces in 3-dimensional cost volumes
    pub fn for_surfaces() -> Self {
        Self::with_ndim(3)
    }

    /// Builder for a given volume dimensionality (2 or 3)
    pub fn for_ndim(ndim: usize) -> Result<Self> {
        if !(2..=3).contains(&ndim) {
            return Err(SurfaceError::InvalidParameter(format!(
                "unsupported volume dimensionality {ndim}"
            )));
        }
        Ok(Self::with_ndim(ndim))
    }

    /// Number of surfaces registered so far
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// The per-surface graphs accumulated so far
    pub fn surfaces(&self) -> &[SurfaceGraph] {
        &self.surfaces
    }

    /// The ordering constraints accumulated so far
    pub fn constraints(&self) -> &[ConstraintSet] {
        &self.constraints
    }

    /// Shape shared by all registered surfaces, once the first is in
    pub fn shape(&self) -> Option<&VolumeShape> {
        self.shape.as_ref()
    }

    /// Size statistics of the problem accumulated so far
    pub fn stats(&self) -> GraphStats {
        let nodes = self
            .shape
            .as_ref()
            .map_or(0, |s| s.voxel_count() * self.surfaces.len());
        GraphStats {
            surfaces: self.surfaces.len(),
            nodes,
            surface_arcs: self.surfaces.iter().map(|g| g.arcs.len()).sum(),
            constraint_arcs: self.constraints.iter().map(|c| c.arcs.len()).sum(),
            terminal_arcs: self.surfaces.iter().map(|g| g.terminal_arc_count()).sum(),
        }
    }

    /// Build and register the graph of one surface
    ///
    /// `cost` is the cost volume (altitude axis last), `max_delta` the
    /// maximum altitude change between laterally adjacent base positions,
    /// and `weight_factor` a positive multiplier applied to every cost
    /// (used to balance intensities when detecting several surfaces in one
    /// volume).
    ///
    /// Returns the 1-based id of the new surface. On error nothing is
    /// registered.
    pub fn add_surface<D>(
        &mut self,
        cost: ArrayView<'_, Cost, D>,
        max_delta: usize,
        weight_factor: f32,
    ) -> Result<SurfaceId>
    where
        D: Dimension,
    {
        let cost = cost.into_dyn();
        if cost.ndim() != self.expected_ndim {
            return Err(SurfaceError::DimensionMismatch {
                expected: self.expected_ndim,
                actual: cost.ndim(),
            });
        }
        if !(weight_factor.is_finite() && weight_factor > 0.0) {
            return Err(SurfaceError::InvalidParameter(format!(
                "weight_factor must be positive and finite, got {weight_factor}"
            )));
        }
        let shape = VolumeShape::new(cost.shape())?;
        if let Some(existing) = &self.shape {
            if *existing != shape {
                return Err(SurfaceError::ShapeMismatch {
                    expected: existing.dims().to_vec(),
                    actual: shape.dims().to_vec(),
                });
            }
        }

        let surface = self.surfaces.len() + 1;
        let start = Instant::now();
        let graph = build_surface_graph(&shape, surface, &cost, max_delta, Weight::from(weight_factor));
        debug!(
            surface,
            nodes = shape.voxel_count(),
            arcs = graph.arcs.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "surface graph built"
        );
        self.shape = Some(shape);
        self.surfaces.push(graph);
        Ok(surface)
    }

    /// Constrain two registered surfaces to a vertical separation range
    ///
    /// Enforces `min_dist <= height(upper) - height(lower) <= max_dist` at
    /// every base position; as a corollary the surfaces cannot cross. On
    /// error nothing is registered.
    pub fn add_separation_constraint(
        &mut self,
        lower: SurfaceId,
        upper: SurfaceId,
        min_dist: usize,
        max_dist: usize,
    ) -> Result<()> {
        let count = self.surfaces.len();
        for id in [lower, upper] {
            if id == 0 || id > count {
                return Err(SurfaceError::InvalidSurface { id, count });
            }
        }
        if lower == upper {
            return Err(SurfaceError::InvalidParameter(format!(
                "cannot constrain surface {lower} against itself"
            )));
        }
        if min_dist > max_dist {
            return Err(SurfaceError::InvalidParameter(format!(
                "min_dist {min_dist} exceeds max_dist {max_dist}"
            )));
        }
        let shape = self.shape.as_ref().expect("registered surfaces imply a shape");
        let spec = SeparationSpec {
            lower,
            upper,
            min_dist,
            max_dist,
        };
        let space = NodeSpace::new(shape.voxel_count());
        let arcs = separation_arcs(&space, shape, &spec);
        debug!(
            lower,
            upper,
            min_dist,
            max_dist,
            arcs = arcs.len(),
            "separation constraint added"
        );
        self.constraints.push(ConstraintSet { spec, arcs });
        Ok(())
    }

    /// Solve the accumulated problem with the bundled solver
    pub fn solve(&self) -> Result<CutSolution> {
        self.solve_with::<DinicSolver>()
    }

    /// Solve the accumulated problem with a caller-chosen solver
    ///
    /// Assembles all surfaces and constraints into one node space, invokes
    /// the solver exactly once and freezes the result. Fails if no surface
    /// was registered or the combined node space exceeds the solver's
    /// 32-bit label range.
    pub fn solve_with<S: MaxFlowSolver>(&self) -> Result<CutSolution> {
        let shape = match &self.shape {
            Some(shape) => shape,
            None => return Err(SurfaceError::EmptyProblem),
        };
        let space = NodeSpace::new(shape.voxel_count());
        let node_count = space.total_nodes(self.surfaces.len());
        if node_count > (u32::MAX as usize) - 2 {
            return Err(SurfaceError::CapacityExceeded { nodes: node_count });
        }
        let arc_count: usize = self.surfaces.iter().map(|g| g.arcs.len()).sum::<usize>()
            + self.constraints.iter().map(|c| c.arcs.len()).sum::<usize>();

        let mut solver = S::with_capacity(node_count, arc_count);
        for graph in &self.surfaces {
            for arc in &graph.arcs {
                solver.set_edge_weight(arc.from, arc.to, arc.cap, arc.rev_cap);
            }
            let range = space.surface_range(graph.surface);
            for (voxel, terminal) in graph.terminals.iter().enumerate() {
                if terminal.is_set() {
                    solver.set_terminal_weights(
                        range.start + voxel,
                        terminal.to_source,
                        terminal.to_sink,
                    );
                }
            }
        }
        for constraint in &self.constraints {
            for arc in &constraint.arcs {
                solver.set_edge_weight(arc.from, arc.to, arc.cap, arc.rev_cap);
            }
        }

        let start = Instant::now();
        let max_flow = solver.compute_maximum_flow();
        debug!(
            nodes = node_count,
            arcs = arc_count,
            max_flow,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "maximum flow computed"
        );

        let mut source_side = RoaringBitmap::new();
        for node in 0..node_count {
            if solver.terminal(node) == Terminal::Source {
                source_side.insert(node as u32);
            }
        }
        Ok(CutSolution::new(
            shape.clone(),
            self.surfaces.len(),
            max_flow,
            source_side,
        ))
    }
}

/// Construct one surface's arcs and terminal capacities
fn build_surface_graph(
    shape: &VolumeShape,
    surface: SurfaceId,
    cost: &ArrayViewD<'_, Cost>,
    max_delta: usize,
    weight_factor: Weight,
) -> SurfaceGraph {
    let space = NodeSpace::new(shape.voxel_count());
    let cost_std = cost.as_standard_layout();
    let costs = cost_std.as_slice().expect("standard layout is contiguous");
    let n_alt = shape.n_alt();
    let base_ndim = shape.base_ndim();

    let mut arcs = Vec::with_capacity(shape.voxel_count() * (1 + 2 * base_ndim));
    let mut terminals = vec![TerminalWeights::default(); shape.voxel_count()];

    for base_flat in 0..shape.base_len() {
        for a in 0..n_alt {
            let flat = shape.flat(base_flat, a);
            let node = space.node_id(surface, flat);
            let mut w = weight_factor * Weight::from(costs[flat]);

            if a > max_delta {
                let target = flat - max_delta;
                for axis in 0..base_ndim {
                    let coord = shape.base_coord(base_flat, axis);
                    let stride = shape.voxel_stride(axis);
                    if coord > 0 {
                        arcs.push(GraphArc::infinite(node, space.node_id(surface, target - stride)));
                    }
                    if coord + 1 < shape.base_dims()[axis] {
                        arcs.push(GraphArc::infinite(node, space.node_id(surface, target + stride)));
                    }
                }
                arcs.push(GraphArc::infinite(node, node - 1));
                w -= weight_factor * Weight::from(costs[flat - 1]);
            } else if a > 0 {
                arcs.push(GraphArc::infinite(node, node - 1));
                w -= weight_factor * Weight::from(costs[flat - 1]);
            } else {
                w = -INFINITE_WEIGHT;
            }

            if w < 0.0 {
                terminals[flat].to_source = -w;
            } else if w > 0.0 {
                terminals[flat].to_sink = w;
            }
        }
    }

    SurfaceGraph {
        surface,
        max_delta,
        arcs,
        terminals,
    }
}
