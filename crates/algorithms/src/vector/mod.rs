//! Vector operations on catchment polygons
//!
//! - Union: dissolve many catchments into one watershed polygon
//! - Area / perimeter / centroid: geometric measurements

mod measurements;
mod union;

pub use measurements::{area, centroid, perimeter};
pub use union::union_all;
