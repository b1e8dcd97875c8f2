//! Upstream reachability
//!
//! Finds every segment whose flow eventually reaches a given segment by
//! walking the predecessor relation breadth-first from the source.

use std::collections::{HashSet, VecDeque};

use cuenca_core::network::{NetworkGraph, NodeIndex, NodeKey};
use cuenca_core::{Algorithm, Error, Result};
use petgraph::visit::VisitMap;

/// Upstream (ancestor) set algorithm bound to one network
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a, K: NodeKey> {
    graph: &'a NetworkGraph<K>,
}

impl<'a, K: NodeKey> Upstream<'a, K> {
    pub fn new(graph: &'a NetworkGraph<K>) -> Self {
        Self { graph }
    }
}

impl<K: NodeKey> Algorithm for Upstream<'_, K> {
    type Input = K;
    type Output = HashSet<K>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Upstream"
    }

    fn description(&self) -> &'static str {
        "Find all network segments draining into a segment"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        ancestors(&input, self.graph)
    }
}

/// All nodes from which `source` is reachable, excluding `source` itself.
///
/// Cycles, parallel edges and self-loops are harmless: each node is
/// expanded at most once.
///
/// # Errors
/// [`Error::UnknownNode`] if `source` is not in the graph.
pub fn ancestors<K: NodeKey>(source: &K, graph: &NetworkGraph<K>) -> Result<HashSet<K>> {
    let start = graph.require(source)?;
    Ok(upstream_indices(graph, start)
        .into_iter()
        .filter_map(|idx| graph.key_of(idx).cloned())
        .collect())
}

/// Handle-level breadth-first walk behind [`ancestors`].
///
/// Returns the handles of every upstream node in discovery order. The
/// visited set is allocated per call, so any number of walks may run
/// concurrently over one shared graph.
pub fn upstream_indices<K: NodeKey>(graph: &NetworkGraph<K>, start: NodeIndex) -> Vec<NodeIndex> {
    let mut visited = graph.visit_map();
    visited.visit(start);

    let mut queue = VecDeque::from([start]);
    let mut found = Vec::new();

    while let Some(node) = queue.pop_front() {
        for pred in graph.predecessor_indices(node) {
            if visited.visit(pred) {
                found.push(pred);
                queue.push_back(pred);
            }
        }
    }

    found
}
