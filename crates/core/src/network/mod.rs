//! Drainage network data structures

mod graph;
mod key;

pub use graph::{FlowEdge, NetworkGraph, NetworkStats};
pub use key::NodeKey;
pub use petgraph::graph::NodeIndex;
