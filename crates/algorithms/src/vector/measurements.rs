//! Geometric measurements of watershed polygons: area, perimeter, centroid

use geo::{Area as GeoArea, Centroid as GeoCentroid, Euclidean, Length, MultiPolygon, Point};

/// Calculate the area of a multi-polygon.
///
/// Returns unsigned area. For geographic CRS, results are in CRS units squared
/// (e.g., square degrees; project to a metric CRS for square meters).
pub fn area(geom: &MultiPolygon<f64>) -> f64 {
    geom.unsigned_area()
}

/// Calculate the perimeter of a multi-polygon.
///
/// Returns the total length of exterior and interior rings.
pub fn perimeter(geom: &MultiPolygon<f64>) -> f64 {
    geom.0
        .iter()
        .map(|p| {
            let ext = Euclidean.length(p.exterior());
            let int: f64 = p.interiors().iter().map(|r| Euclidean.length(r)).sum();
            ext + int
        })
        .sum()
}

/// Area-weighted centroid, `None` for an empty geometry.
pub fn centroid(geom: &MultiPolygon<f64>) -> Option<Point<f64>> {
    geom.centroid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0),
        ]])
    }

    #[test]
    fn test_area_square() {
        let a = area(&square());
        assert!((a - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_empty() {
        assert_eq!(area(&MultiPolygon::new(vec![])), 0.0);
    }

    #[test]
    fn test_perimeter_with_hole() {
        let donut = MultiPolygon::new(vec![polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 4.0, y: 4.0), (x: 4.0, y: 6.0), (x: 6.0, y: 6.0), (x: 6.0, y: 4.0)]],
        )]);
        assert!((perimeter(&donut) - 48.0).abs() < 1e-10);
    }

    #[test]
    fn test_centroid() {
        let c = centroid(&square()).unwrap();
        assert!((c.x() - 5.0).abs() < 1e-10);
        assert!((c.y() - 5.0).abs() < 1e-10);
        assert!(centroid(&MultiPolygon::new(vec![])).is_none());
    }
}
