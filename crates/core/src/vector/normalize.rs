//! Single internal geometry representation for catchments.
//!
//! Every catchment is stored as a counter-clockwise oriented
//! `MultiPolygon<f64>` so that unions never branch on geometry type and
//! never mix ring winding orders.

use std::fmt::Display;

use geo::algorithm::orient::{Direction, Orient};
use geo::Area;
use geo_types::{Geometry, MultiPolygon, Polygon};

use crate::error::{Error, Result};

/// Name of a geometry variant, for diagnostics.
pub fn geometry_type_name(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Upcast an areal geometry to a multi-polygon.
///
/// A `Polygon` becomes a one-member `MultiPolygon`; `Rect` and `Triangle`
/// are converted to their polygon. Any other type is an
/// [`Error::GeometryType`]: it means the wrong layer was supplied.
pub fn to_multi_polygon(id: &impl Display, geom: Geometry<f64>) -> Result<MultiPolygon<f64>> {
    match geom {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        Geometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Ok(MultiPolygon::new(vec![t.to_polygon()])),
        other => Err(Error::GeometryType {
            id: id.to_string(),
            found: geometry_type_name(&other),
        }),
    }
}

/// A polygon that covers no area: open or collapsed exterior ring.
pub fn is_degenerate(poly: &Polygon<f64>) -> bool {
    poly.exterior().0.len() < 4 || poly.unsigned_area() <= 0.0
}

/// Drop degenerate members and orient rings consistently
/// (exterior counter-clockwise, interiors clockwise).
///
/// Returns the cleaned geometry and the number of members dropped.
pub fn clean(mp: MultiPolygon<f64>) -> (MultiPolygon<f64>, usize) {
    let before = mp.0.len();
    let kept: Vec<Polygon<f64>> = mp.into_iter().filter(|p| !is_degenerate(p)).collect();
    let dropped = before - kept.len();
    (MultiPolygon::new(kept).orient(Direction::Default), dropped)
}
