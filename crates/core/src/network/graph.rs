//! Directed drainage network

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Visitable;
use petgraph::Direction;
use tracing::debug;

use crate::error::{Error, Result};
use crate::network::NodeKey;

/// One row of a flow table: water leaves `upstream` and enters `downstream`.
///
/// `downstream == None` marks a segment that leaves the modelled network
/// (the "terminal sentinel" of NHDPlus flow tables, conventionally `0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowEdge<K> {
    pub upstream: K,
    pub downstream: Option<K>,
}

impl<K: NodeKey> FlowEdge<K> {
    pub fn new(upstream: K, downstream: K) -> Self {
        Self {
            upstream,
            downstream: Some(downstream),
        }
    }

    /// A segment draining out of the network.
    pub fn terminal(upstream: K) -> Self {
        Self {
            upstream,
            downstream: None,
        }
    }

    /// Convert a raw `(id, to_id)` row, mapping the sentinel to `None`.
    pub fn from_row(upstream: K, downstream: K, sentinel: &K) -> Self {
        if &downstream == sentinel {
            Self::terminal(upstream)
        } else {
            Self::new(upstream, downstream)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.downstream.is_none()
    }
}

/// Counts collected while building a [`NetworkGraph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub nodes: usize,
    pub edges: usize,
    /// Rows that drain out of the network (no edge created)
    pub terminal_rows: usize,
    /// Nodes that appeared only as an edge endpoint
    pub implicit_nodes: usize,
    pub self_loops: usize,
    pub duplicate_edges: usize,
}

/// Flow connectivity between network segments.
///
/// Nodes are addressed by dense integer handles ([`NodeIndex`]) with a
/// key-to-handle index on the side. The graph is immutable once built, so
/// it can be shared by reference across any number of concurrent
/// upstream queries.
#[derive(Debug, Clone)]
pub struct NetworkGraph<K: NodeKey> {
    graph: DiGraph<K, ()>,
    index: HashMap<K, NodeIndex>,
    stats: NetworkStats,
}

impl<K: NodeKey> NetworkGraph<K> {
    /// Build a graph from a node list and flow edges.
    ///
    /// Every node in `nodes` is added whether or not it takes part in an
    /// edge. Edge endpoints missing from `nodes` are added implicitly.
    /// Terminal edges add their upstream node and nothing else. Multi-edges
    /// and self-loops are accepted as-is.
    ///
    /// # Errors
    /// [`Error::InvalidEdge`] when any id is malformed.
    pub fn build<N, E>(nodes: N, edges: E) -> Result<Self>
    where
        N: IntoIterator<Item = K>,
        E: IntoIterator<Item = FlowEdge<K>>,
    {
        let mut net = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            stats: NetworkStats::default(),
        };

        for node in nodes {
            if let Some(reason) = node.malformed() {
                return Err(Error::InvalidEdge {
                    upstream: node.to_string(),
                    downstream: "-".into(),
                    reason: format!("malformed node id: {}", reason),
                });
            }
            net.ensure_node(node);
        }
        let listed = net.graph.node_count();

        let mut seen: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
        for edge in edges {
            check_edge(&edge)?;

            let from = net.ensure_node(edge.upstream);
            let Some(downstream) = edge.downstream else {
                net.stats.terminal_rows += 1;
                continue;
            };
            let to = net.ensure_node(downstream);

            if from == to {
                net.stats.self_loops += 1;
            }
            if !seen.insert((from, to)) {
                net.stats.duplicate_edges += 1;
            }
            net.graph.add_edge(from, to, ());
        }

        net.stats.nodes = net.graph.node_count();
        net.stats.edges = net.graph.edge_count();
        net.stats.implicit_nodes = net.stats.nodes - listed;

        debug!(
            nodes = net.stats.nodes,
            edges = net.stats.edges,
            terminal = net.stats.terminal_rows,
            implicit = net.stats.implicit_nodes,
            self_loops = net.stats.self_loops,
            duplicates = net.stats.duplicate_edges,
            "built drainage network"
        );

        Ok(net)
    }

    /// Build from `(id, to_id)` flow-table rows.
    ///
    /// Every row's `id` becomes a node; rows whose `to_id` equals
    /// `sentinel` drain out of the network and create no edge. A row whose
    /// `id` is the sentinel itself is rejected.
    pub fn from_flow_table<I>(rows: I, sentinel: &K) -> Result<Self>
    where
        I: IntoIterator<Item = (K, K)>,
    {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for (id, to_id) in rows {
            if &id == sentinel {
                return Err(Error::InvalidEdge {
                    upstream: id.to_string(),
                    downstream: to_id.to_string(),
                    reason: "terminal sentinel used as a segment id".into(),
                });
            }
            nodes.push(id.clone());
            edges.push(FlowEdge::from_row(id, to_id, sentinel));
        }
        Self::build(nodes, edges)
    }

    /// Build from textual flow-table rows, parsing each id as `K`.
    pub fn from_raw_records<I, S>(rows: I, sentinel: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
        K: FromStr,
        <K as FromStr>::Err: std::fmt::Display,
    {
        let sentinel: K = sentinel
            .trim()
            .parse()
            .map_err(|e: <K as FromStr>::Err| Error::InvalidParameter {
                name: "sentinel",
                value: sentinel.to_string(),
                reason: e.to_string(),
            })?;

        let mut parsed = Vec::new();
        for (up, down) in rows {
            let (up, down) = (up.as_ref(), down.as_ref());
            let invalid = |reason: String| Error::InvalidEdge {
                upstream: up.to_string(),
                downstream: down.to_string(),
                reason,
            };
            let u: K = up.trim().parse().map_err(|e| invalid(format!("upstream id: {}", e)))?;
            let d: K = down.trim().parse().map_err(|e| invalid(format!("downstream id: {}", e)))?;
            parsed.push((u, d));
        }

        Self::from_flow_table(parsed, &sentinel)
    }

    fn ensure_node(&mut self, key: K) -> NodeIndex {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.index.insert(key, idx);
        idx
    }

    // Queries

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats
    }

    pub fn has_node(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Handle for a node key
    pub fn index_of(&self, key: &K) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Handle for a node key, or [`Error::UnknownNode`]
    pub fn require(&self, key: &K) -> Result<NodeIndex> {
        self.index_of(key).ok_or_else(|| Error::unknown_node(key))
    }

    /// Key stored at a handle
    pub fn key_of(&self, idx: NodeIndex) -> Option<&K> {
        self.graph.node_weight(idx)
    }

    /// Iterate over all node keys
    pub fn nodes(&self) -> impl Iterator<Item = &K> + '_ {
        self.graph.node_weights()
    }

    /// Nodes with an edge pointing at `key`.
    pub fn predecessors(&self, key: &K) -> Result<HashSet<K>> {
        let idx = self.require(key)?;
        Ok(self
            .predecessor_indices(idx)
            .map(|p| self.graph[p].clone())
            .collect())
    }

    /// Nodes that `key` drains into.
    pub fn successors(&self, key: &K) -> Result<HashSet<K>> {
        let idx = self.require(key)?;
        Ok(self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|s| self.graph[s].clone())
            .collect())
    }

    /// Handle-level predecessor iteration used by traversals.
    /// Parallel edges yield the same neighbour more than once.
    pub fn predecessor_indices(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    /// A fresh visited set sized to this graph.
    ///
    /// Each traversal allocates its own; nothing is cached on the graph.
    pub fn visit_map(&self) -> <DiGraph<K, ()> as Visitable>::Map {
        self.graph.visit_map()
    }
}

fn check_edge<K: NodeKey>(edge: &FlowEdge<K>) -> Result<()> {
    let downstream = edge
        .downstream
        .as_ref()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "<outlet>".into());

    if let Some(reason) = edge.upstream.malformed() {
        return Err(Error::InvalidEdge {
            upstream: edge.upstream.to_string(),
            downstream,
            reason: format!("upstream id: {}", reason),
        });
    }
    if let Some(reason) = edge.downstream.as_ref().and_then(|d| d.malformed()) {
        return Err(Error::InvalidEdge {
            upstream: edge.upstream.to_string(),
            downstream,
            reason: format!("downstream id: {}", reason),
        });
    }
    Ok(())
}
