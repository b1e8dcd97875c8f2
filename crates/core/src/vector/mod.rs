//! Catchment geometry: type normalization and the per-node store

mod normalize;
mod store;

pub use normalize::{clean, geometry_type_name, is_degenerate, to_multi_polygon};
pub use store::{CatchmentRecord, GeometryResolver, GeometryStore, Resolved};
