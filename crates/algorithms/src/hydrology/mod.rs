//! Hydrological analysis on drainage networks
//!
//! - Upstream: all segments draining into a segment (reverse reachability)
//! - Watershed: merged catchment polygon and coverage of a segment's upstream area

pub(crate) mod upstream;
mod watershed;

pub use upstream::{ancestors, upstream_indices, Upstream};
pub use watershed::{
    delineate, delineate_with, DelineateParams, Delineation, WatershedResult,
};
