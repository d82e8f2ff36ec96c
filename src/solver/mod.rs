//! Max-flow solver interface
//!
//! The cut problem is handed to an external max-flow solver through the
//! [`MaxFlowSolver`] trait: the solver is constructed with a node and arc
//! count, fed directed arc capacities and per-node terminal capacities,
//! asked for the maximum flow exactly once, and then queried for the
//! terminal side of every node. The surface machinery consumes this
//! interface and never depends on a particular algorithm; [`DinicSolver`]
//! is the bundled default implementation.

pub mod dinic;

pub use dinic::DinicSolver;

use serde::{Deserialize, Serialize};

use crate::graph::{NodeId, Weight};

/// Terminal side of a node after the max-flow computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    /// Node remains connected to the source in the residual graph
    Source,
    /// Node is separated from the source by the minimum cut
    Sink,
}

/// A min-cut / max-flow solver over a two-terminal network
///
/// Nodes are addressed by flat ids in `[0, node_count)`; the two terminals
/// are implicit. Arc and terminal capacities may be registered in any
/// order before [`compute_maximum_flow`](MaxFlowSolver::compute_maximum_flow)
/// is called; node labels are only meaningful afterwards.
pub trait MaxFlowSolver {
    /// Create a solver for `nodes` nodes, sized for about `arcs` arcs
    fn with_capacity(nodes: usize, arcs: usize) -> Self
    where
        Self: Sized;

    /// Register a directed arc with forward and backward capacity
    fn set_edge_weight(&mut self, from: NodeId, to: NodeId, cap: Weight, rev_cap: Weight);

    /// Register terminal capacities for a node
    fn set_terminal_weights(&mut self, node: NodeId, to_source: Weight, to_sink: Weight);

    /// Run the max-flow computation and return the flow value
    fn compute_maximum_flow(&mut self) -> Weight;

    /// Terminal side of a node, valid after the flow computation
    fn terminal(&self, node: NodeId) -> Terminal;
}
