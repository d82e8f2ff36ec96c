//! Graph primitives for the surface cut problem
//!
//! Every surface occupies a disjoint range of one shared node address
//! space; [`NodeSpace`] is the single translation point between
//! `(surface, voxel)` pairs and the flat node ids consumed by the max-flow
//! solver. Arcs carry a forward and a backward capacity, matching the
//! solver interface.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Flat node identifier inside the shared solver address space
pub type NodeId = usize;

/// 1-based surface identifier, assigned in order of construction
pub type SurfaceId = usize;

/// Arc and terminal capacity type
pub type Weight = f64;

/// Capacity used for constraint arcs that must never be cut
///
/// Finite stand-in for infinity, as in the classical graph-cut
/// formulations: any cut through such an arc is worse than every cut that
/// avoids them, as long as accumulated cost differences stay well below
/// this value.
pub const INFINITE_WEIGHT: Weight = 1_000_000.0;

/// A directed arc with forward and backward capacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphArc {
    /// Tail node
    pub from: NodeId,
    /// Head node
    pub to: NodeId,
    /// Capacity in the `from -> to` direction
    pub cap: Weight,
    /// Capacity in the `to -> from` direction
    pub rev_cap: Weight,
}

impl GraphArc {
    /// Arc with infinite forward capacity and zero backward capacity
    #[inline]
    pub fn infinite(from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            cap: INFINITE_WEIGHT,
            rev_cap: 0.0,
        }
    }

    /// Arc with infinite capacity in both directions
    #[inline]
    pub fn infinite_symmetric(from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            cap: INFINITE_WEIGHT,
            rev_cap: INFINITE_WEIGHT,
        }
    }
}

/// Per-voxel terminal capacities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalWeights {
    /// Capacity of the arc from the source terminal to this node
    pub to_source: Weight,
    /// Capacity of the arc from this node to the sink terminal
    pub to_sink: Weight,
}

impl TerminalWeights {
    /// True if either terminal arc has non-zero capacity
    #[inline]
    pub fn is_set(&self) -> bool {
        self.to_source > 0.0 || self.to_sink > 0.0
    }
}

/// Translation between `(surface, voxel)` pairs and flat node ids
///
/// Surface `s` (1-based) owns the contiguous id range
/// `[(s - 1) * voxels, s * voxels)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpace {
    voxels_per_surface: usize,
}

impl NodeSpace {
    /// Create a node space for surfaces of `voxels_per_surface` voxels each
    pub fn new(voxels_per_surface: usize) -> Self {
        Self { voxels_per_surface }
    }

    /// Voxel count of a single surface
    pub fn voxels_per_surface(&self) -> usize {
        self.voxels_per_surface
    }

    /// Flat node id of a voxel of the given surface
    #[inline]
    pub fn node_id(&self, surface: SurfaceId, voxel: usize) -> NodeId {
        debug_assert!(surface >= 1);
        debug_assert!(voxel < self.voxels_per_surface);
        (surface - 1) * self.voxels_per_surface + voxel
    }

    /// Id range owned by a surface
    pub fn surface_range(&self, surface: SurfaceId) -> Range<NodeId> {
        let start = (surface - 1) * self.voxels_per_surface;
        start..start + self.voxels_per_surface
    }

    /// Total node count for `n_surfaces` surfaces
    pub fn total_nodes(&self, n_surfaces: usize) -> usize {
        n_surfaces * self.voxels_per_surface
    }
}

/// One surface's share of the cut problem: its arcs and terminal capacities
///
/// Arcs already carry node ids translated into the shared address space;
/// terminal capacities are indexed by surface-local voxel index.
#[derive(Debug, Clone)]
pub struct SurfaceGraph {
    pub(crate) surface: SurfaceId,
    pub(crate) max_delta: usize,
    pub(crate) arcs: Vec<GraphArc>,
    pub(crate) terminals: Vec<TerminalWeights>,
}

impl SurfaceGraph {
    /// 1-based id of this surface
    pub fn surface_id(&self) -> SurfaceId {
        self.surface
    }

    /// Maximum altitude change between lateral neighbors
    pub fn max_delta(&self) -> usize {
        self.max_delta
    }

    /// Number of smoothness and monotonicity arcs
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Number of voxels with at least one terminal arc
    pub fn terminal_arc_count(&self) -> usize {
        self.terminals.iter().filter(|t| t.is_set()).count()
    }
}

/// Size statistics of an assembled cut problem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of registered surfaces
    pub surfaces: usize,
    /// Total node count across all surfaces
    pub nodes: usize,
    /// Intra-surface arcs (monotonicity + smoothness)
    pub surface_arcs: usize,
    /// Inter-surface ordering arcs
    pub constraint_arcs: usize,
    /// Voxels with a non-zero terminal capacity
    pub terminal_arcs: usize,
}
