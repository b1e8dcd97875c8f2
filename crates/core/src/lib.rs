//! # Cuenca Core
//!
//! Core types, traits and I/O for the cuenca watershed library.
//!
//! This crate provides:
//! - `NetworkGraph<K>`: immutable directed drainage network
//! - `GeometryStore<K>`: catchment polygons normalized to multi-polygons
//! - Error taxonomy shared by every crate
//! - Algorithm traits for consistent API
//! - Thin readers/writers for flow tables, catchments, queries and results

pub mod error;
pub mod io;
pub mod network;
pub mod vector;

pub use error::{Error, PartialCoverageWarning, Result};
pub use network::{FlowEdge, NetworkGraph, NetworkStats, NodeIndex, NodeKey};
pub use vector::{CatchmentRecord, GeometryResolver, GeometryStore, Resolved};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, PartialCoverageWarning, Result};
    pub use crate::network::{FlowEdge, NetworkGraph, NodeKey};
    pub use crate::vector::{GeometryResolver, GeometryStore};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in cuenca.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
