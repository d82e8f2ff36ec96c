//! Inter-surface ordering constraints
//!
//! Couples two surfaces built over the same volume so that, at every base
//! position, the upper surface sits between `min_dist` and `max_dist`
//! altitude steps above the lower one. The coupling is encoded purely as
//! infinite-capacity arcs between the two surfaces' node ranges: violating
//! the separation would force the cut through one of them, which is never
//! optimal, so the solved surfaces can never cross.

use serde::{Deserialize, Serialize};

use crate::graph::{GraphArc, NodeSpace, SurfaceId};
use crate::volume::VolumeShape;

/// An ordering constraint between two surfaces, with its generated arcs
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    pub(crate) spec: SeparationSpec,
    pub(crate) arcs: Vec<GraphArc>,
}

impl ConstraintSet {
    /// The separation this constraint enforces
    pub fn spec(&self) -> &SeparationSpec {
        &self.spec
    }

    /// Number of generated ordering arcs
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }
}

/// Separation between a lower and an upper surface
///
/// Enforces `min_dist <= height(upper) - height(lower) <= max_dist` at
/// every base position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparationSpec {
    /// Surface forced to lie below
    pub lower: SurfaceId,
    /// Surface forced to lie above
    pub upper: SurfaceId,
    /// Minimum altitude separation (voxels)
    pub min_dist: usize,
    /// Maximum altitude separation (voxels)
    pub max_dist: usize,
}

/// Generate the ordering arcs for a separation constraint
///
/// Two arc families per column: the upper surface's node at altitude `a`
/// pins the lower surface's source side at `a - max_dist`, and the lower
/// surface's node at `a` pins the upper surface's source side at
/// `a + min_dist`. A fixed separation (`min_dist == max_dist`) collapses
/// both families into one symmetric arc per node.
pub(crate) fn separation_arcs(
    space: &NodeSpace,
    shape: &VolumeShape,
    spec: &SeparationSpec,
) -> Vec<GraphArc> {
    let n_alt = shape.n_alt();
    let down_span = n_alt.saturating_sub(spec.max_dist + 1);
    let up_span = n_alt.saturating_sub(spec.min_dist);
    let per_column = if spec.min_dist == spec.max_dist {
        down_span
    } else {
        down_span + up_span
    };
    let mut arcs = Vec::with_capacity(shape.base_len() * per_column);

    for base_flat in 0..shape.base_len() {
        if spec.min_dist == spec.max_dist {
            for a in spec.max_dist + 1..n_alt {
                arcs.push(GraphArc::infinite_symmetric(
                    space.node_id(spec.upper, shape.flat(base_flat, a)),
                    space.node_id(spec.lower, shape.flat(base_flat, a - spec.max_dist)),
                ));
            }
        } else {
            for a in spec.max_dist + 1..n_alt {
                arcs.push(GraphArc::infinite(
                    space.node_id(spec.upper, shape.flat(base_flat, a)),
                    space.node_id(spec.lower, shape.flat(base_flat, a - spec.max_dist)),
                ));
            }
            for a in 0..up_span {
                arcs.push(GraphArc::infinite(
                    space.node_id(spec.lower, shape.flat(base_flat, a)),
                    space.node_id(spec.upper, shape.flat(base_flat, a + spec.min_dist)),
                ));
            }
        }
    }
    arcs
}
