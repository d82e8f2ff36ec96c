//! Bundled default max-flow solver
//!
//! Dinic's algorithm over a paired residual-arc representation: arc `i` and
//! arc `i ^ 1` are each other's reverse. Terminal capacities become arcs of
//! an implicit super-source and super-sink, so the whole problem is a plain
//! two-terminal network. After the flow computation the source side of the
//! minimum cut is recovered by one residual-graph traversal.

use std::collections::VecDeque;

use super::{MaxFlowSolver, Terminal};
use crate::graph::{NodeId, Weight};

/// Residual capacities below this threshold count as saturated
const FLOW_EPSILON: Weight = 1e-9;

#[derive(Debug, Clone, Copy)]
struct ResidualArc {
    to: u32,
    cap: Weight,
}

/// Dinic max-flow solver
///
/// Constructed through [`MaxFlowSolver::with_capacity`]; see the trait for
/// the calling protocol.
#[derive(Debug)]
pub struct DinicSolver {
    node_count: usize,
    arcs: Vec<ResidualArc>,
    adj: Vec<Vec<u32>>,
    level: Vec<i32>,
    iter: Vec<usize>,
    source_side: Vec<bool>,
}

impl DinicSolver {
    #[inline]
    fn source(&self) -> usize {
        self.node_count
    }

    #[inline]
    fn sink(&self) -> usize {
        self.node_count + 1
    }

    fn add_arc(&mut self, from: usize, to: usize, cap: Weight, rev_cap: Weight) {
        let idx = self.arcs.len() as u32;
        self.arcs.push(ResidualArc {
            to: to as u32,
            cap,
        });
        self.arcs.push(ResidualArc {
            to: from as u32,
            cap: rev_cap,
        });
        self.adj[from].push(idx);
        self.adj[to].push(idx + 1);
    }

    /// Build the BFS level graph; true if the sink is still reachable
    fn bfs_levels(&mut self) -> bool {
        self.level.fill(-1);
        let mut queue = VecDeque::new();
        let source = self.source();
        self.level[source] = 0;
        queue.push_back(source as u32);
        while let Some(v) = queue.pop_front() {
            let v = v as usize;
            for &a in &self.adj[v] {
                let arc = self.arcs[a as usize];
                if arc.cap > FLOW_EPSILON && self.level[arc.to as usize] < 0 {
                    self.level[arc.to as usize] = self.level[v] + 1;
                    queue.push_back(arc.to);
                }
            }
        }
        self.level[self.sink()] >= 0
    }

    /// Saturate the current level graph, returning the flow pushed
    ///
    /// Iterative depth-first search with an explicit arc path; augmenting
    /// paths can run the whole height of an altitude column, so recursion
    /// is not an option here.
    fn blocking_flow(&mut self) -> Weight {
        let source = self.source();
        let sink = self.sink();
        let mut total = 0.0;
        let mut path: Vec<u32> = Vec::new();
        'walk: loop {
            let v = match path.last() {
                Some(&a) => self.arcs[a as usize].to as usize,
                None => source,
            };
            if v == sink {
                let mut bottleneck = Weight::INFINITY;
                for &a in &path {
                    bottleneck = bottleneck.min(self.arcs[a as usize].cap);
                }
                for &a in &path {
                    self.arcs[a as usize].cap -= bottleneck;
                    self.arcs[(a ^ 1) as usize].cap += bottleneck;
                }
                total += bottleneck;
                // back up to just before the first saturated arc; its tail's
                // iterator still points at it and will skip it on re-entry
                let mut keep = 0;
                for (i, &a) in path.iter().enumerate() {
                    if self.arcs[a as usize].cap <= FLOW_EPSILON {
                        keep = i;
                        break;
                    }
                }
                path.truncate(keep);
                continue 'walk;
            }
            while self.iter[v] < self.adj[v].len() {
                let a = self.adj[v][self.iter[v]];
                let arc = self.arcs[a as usize];
                if arc.cap > FLOW_EPSILON && self.level[arc.to as usize] == self.level[v] + 1 {
                    path.push(a);
                    continue 'walk;
                }
                self.iter[v] += 1;
            }
            // dead end: remove the node from this phase and retreat
            self.level[v] = -1;
            match path.pop() {
                Some(a) => {
                    let tail = self.arcs[(a ^ 1) as usize].to as usize;
                    self.iter[tail] += 1;
                }
                None => break,
            }
        }
        total
    }

    /// Mark every node reachable from the source in the residual graph
    fn label_source_side(&mut self) {
        self.source_side.fill(false);
        let mut queue = VecDeque::new();
        let source = self.source();
        self.source_side[source] = true;
        queue.push_back(source as u32);
        while let Some(v) = queue.pop_front() {
            let v = v as usize;
            for &a in &self.adj[v] {
                let arc = self.arcs[a as usize];
                if arc.cap > FLOW_EPSILON && !self.source_side[arc.to as usize] {
                    self.source_side[arc.to as usize] = true;
                    queue.push_back(arc.to);
                }
            }
        }
    }
}

impl MaxFlowSolver for DinicSolver {
    fn with_capacity(nodes: usize, arcs: usize) -> Self {
        Self {
            node_count: nodes,
            arcs: Vec::with_capacity(2 * (arcs + nodes)),
            adj: vec![Vec::new(); nodes + 2],
            level: vec![-1; nodes + 2],
            iter: vec![0; nodes + 2],
            source_side: vec![false; nodes + 2],
        }
    }

    fn set_edge_weight(&mut self, from: NodeId, to: NodeId, cap: Weight, rev_cap: Weight) {
        self.add_arc(from, to, cap, rev_cap);
    }

    fn set_terminal_weights(&mut self, node: NodeId, to_source: Weight, to_sink: Weight) {
        if to_source > 0.0 {
            let source = self.source();
            self.add_arc(source, node, to_source, 0.0);
        }
        if to_sink > 0.0 {
            let sink = self.sink();
            self.add_arc(node, sink, to_sink, 0.0);
        }
    }

    fn compute_maximum_flow(&mut self) -> Weight {
        let mut flow = 0.0;
        while self.bfs_levels() {
            self.iter.fill(0);
            let pushed = self.blocking_flow();
            if pushed <= FLOW_EPSILON {
                break;
            }
            flow += pushed;
        }
        self.label_source_side();
        flow
    }

    fn terminal(&self, node: NodeId) -> Terminal {
        if self.source_side[node] {
            Terminal::Source
        } else {
            Terminal::Sink
        }
    }
}
