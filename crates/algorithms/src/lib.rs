//! # Cuenca Algorithms
//!
//! Watershed analysis algorithms for cuenca.
//!
//! ## Available Algorithm Categories
//!
//! - **hydrology**: upstream reachability, watershed delineation with coverage
//! - **vector**: polygon union, area, perimeter, centroid

pub mod hydrology;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        ancestors, delineate, delineate_with, DelineateParams, Delineation, Upstream,
        WatershedResult,
    };
    pub use crate::vector::{area, centroid, union_all};
    pub use cuenca_core::prelude::*;
}
