//! Polygon union (dissolve) for watershed assembly

use geo::algorithm::orient::{Direction, Orient};
use geo::{unary_union, MultiPolygon, Polygon, Winding};

/// Union of all input multi-polygons into one multi-polygon.
///
/// Shared boundaries between adjacent catchments are dissolved and
/// overlapping or duplicate polygons counted once. The result covers
/// exactly the combined area and does not depend on input order.
/// Empty input yields an empty multi-polygon.
pub fn union_all<'a, I>(geoms: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = &'a MultiPolygon<f64>>,
{
    let geoms: Vec<&MultiPolygon<f64>> = geoms.into_iter().filter(|g| !g.0.is_empty()).collect();
    if geoms.is_empty() {
        return MultiPolygon::new(Vec::new());
    }

    // The overlay picks its fill rule from the first ring it sees, so every
    // ring must share one winding convention.
    if geoms.iter().all(|g| g.0.iter().all(is_default_oriented)) {
        unary_union(geoms)
    } else {
        let oriented: Vec<MultiPolygon<f64>> =
            geoms.iter().map(|g| g.orient(Direction::Default)).collect();
        unary_union(&oriented)
    }
}

fn is_default_oriented(poly: &Polygon<f64>) -> bool {
    poly.exterior().is_ccw() && poly.interiors().iter().all(|ring| ring.is_cw())
}
