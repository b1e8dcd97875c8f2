//! Watershed delineation on a drainage network
//!
//! Combines the upstream set of a source segment with the catchment
//! polygons of those segments:
//! - Upstream: source plus every segment draining into it
//! - Coverage: share of those segments with a catchment polygon
//! - Geometry: union of the matched catchments

use cuenca_core::network::{NetworkGraph, NodeKey};
use cuenca_core::vector::GeometryResolver;
use cuenca_core::{Algorithm, Error, PartialCoverageWarning, Result};
use geo::MultiPolygon;
use tracing::debug;

use crate::hydrology::upstream::upstream_indices;
use crate::vector::{area, union_all};

/// Parameters for watershed delineation
#[derive(Debug, Clone)]
pub struct DelineateParams {
    /// Match ratio below which a result carries a
    /// [`PartialCoverageWarning`]. Default: 1.0 (any gap warns)
    pub coverage_threshold: f64,
}

impl Default for DelineateParams {
    fn default() -> Self {
        Self {
            coverage_threshold: 1.0,
        }
    }
}

impl DelineateParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.coverage_threshold) {
            return Err(Error::InvalidParameter {
                name: "coverage_threshold",
                value: self.coverage_threshold.to_string(),
                reason: "must be within [0, 1]".into(),
            });
        }
        Ok(())
    }
}

/// Delineated watershed of one source segment.
#[derive(Debug, Clone)]
pub struct WatershedResult<K> {
    pub source: K,
    /// Union of matched catchments; empty when nothing matched
    pub geometry: MultiPolygon<f64>,
    /// `matched_count / upstream_count`, in `[0, 1]`
    pub match_ratio: f64,
    pub matched_count: usize,
    /// Size of the upstream set, source included
    pub upstream_count: usize,
    pub coverage_warning: Option<PartialCoverageWarning>,
}

impl<K> WatershedResult<K> {
    pub fn area(&self) -> f64 {
        area(&self.geometry)
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }

    /// Every upstream segment had a catchment polygon
    pub fn is_complete(&self) -> bool {
        self.matched_count == self.upstream_count
    }

    /// Match ratio as a percentage rounded to one decimal
    pub fn match_percent(&self) -> f64 {
        (self.match_ratio * 1000.0).round() / 10.0
    }
}

/// Watershed delineation bound to one network and catchment store
#[derive(Debug)]
pub struct Delineation<'a, K: NodeKey, S> {
    graph: &'a NetworkGraph<K>,
    store: &'a S,
}

impl<'a, K: NodeKey, S: GeometryResolver<K>> Delineation<'a, K, S> {
    pub fn new(graph: &'a NetworkGraph<K>, store: &'a S) -> Self {
        Self { graph, store }
    }
}

impl<K: NodeKey, S: GeometryResolver<K>> Algorithm for Delineation<'_, K, S> {
    type Input = K;
    type Output = WatershedResult<K>;
    type Params = DelineateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Watershed"
    }

    fn description(&self) -> &'static str {
        "Delineate the upstream contributing area of a network segment"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        delineate_with(&input, self.graph, self.store, &params)
    }
}

/// Delineate the watershed of `source` with default parameters.
///
/// # Errors
/// [`Error::UnknownNode`] if `source` is not in the graph. Missing
/// catchments are never an error; they lower `match_ratio`.
pub fn delineate<K, S>(source: &K, graph: &NetworkGraph<K>, store: &S) -> Result<WatershedResult<K>>
where
    K: NodeKey,
    S: GeometryResolver<K>,
{
    delineate_with(source, graph, store, &DelineateParams::default())
}

/// Delineate the watershed of `source`.
pub fn delineate_with<K, S>(
    source: &K,
    graph: &NetworkGraph<K>,
    store: &S,
    params: &DelineateParams,
) -> Result<WatershedResult<K>>
where
    K: NodeKey,
    S: GeometryResolver<K>,
{
    params.validate()?;
    let start = graph.require(source)?;

    let mut upstream = upstream_indices(graph, start);
    upstream.push(start);
    let keys: Vec<&K> = upstream.iter().filter_map(|&idx| graph.key_of(idx)).collect();

    let resolved = store.resolve(keys);
    let match_ratio = resolved.match_ratio();
    let geometry = union_all(resolved.geometries.iter().copied());

    let coverage_warning = (match_ratio < params.coverage_threshold).then(|| PartialCoverageWarning {
        source: source.to_string(),
        matched: resolved.matched,
        queried: resolved.queried,
    });

    debug!(
        source = %source,
        upstream = resolved.queried,
        matched = resolved.matched,
        parts = geometry.0.len(),
        "delineated watershed"
    );

    Ok(WatershedResult {
        source: source.clone(),
        geometry,
        match_ratio,
        matched_count: resolved.matched,
        upstream_count: resolved.queried,
        coverage_warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cuenca_core::GeometryStore;
    use geo::{polygon, Geometry};

    fn network() -> NetworkGraph<i64> {
        NetworkGraph::from_flow_table(vec![(1, 0), (2, 1), (3, 2), (4, 2)], &0).unwrap()
    }

    fn cell(col: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: col, y: 0.0),
            (x: col + 1.0, y: 0.0),
            (x: col + 1.0, y: 1.0),
            (x: col, y: 1.0),
        ])
    }

    #[test]
    fn test_partial_store() {
        let g = network();
        let store =
            GeometryStore::from_records(vec![(1_i64, cell(0.0)), (2, cell(1.0)), (3, cell(2.0))]).unwrap();

        let ws = delineate(&1, &g, &store).unwrap();
        assert_eq!(ws.upstream_count, 4);
        assert_eq!(ws.matched_count, 3);
        assert_relative_eq!(ws.match_ratio, 0.75);
        assert_relative_eq!(ws.area(), 3.0, epsilon = 1e-9);
        assert_eq!(ws.geometry.0.len(), 1, "adjacent cells dissolve into one polygon");
        assert!(!ws.is_complete());
        assert_eq!(ws.match_percent(), 75.0);

        let warning = ws.coverage_warning.expect("partial coverage should warn");
        assert_eq!(warning.missing(), 1);
    }

    #[test]
    fn test_complete_store() {
        let g = network();
        let store = GeometryStore::from_records((1_i64..=4).map(|i| (i, cell(i as f64)))).unwrap();
        let ws = delineate(&2, &g, &store).unwrap();
        assert_eq!(ws.upstream_count, 3);
        assert_eq!(ws.match_ratio, 1.0);
        assert!(ws.is_complete());
        assert!(ws.coverage_warning.is_none());
    }

    #[test]
    fn test_empty_store() {
        let g = network();
        let store = GeometryStore::<i64>::new();
        let ws = delineate(&1, &g, &store).unwrap();
        assert_eq!(ws.match_ratio, 0.0);
        assert!(ws.is_empty());
        assert_eq!(ws.area(), 0.0);
    }

    #[test]
    fn test_headwater_is_its_own_catchment() {
        let g = network();
        let store = GeometryStore::from_records(vec![(4_i64, cell(7.0))]).unwrap();
        let ws = delineate(&4, &g, &store).unwrap();
        assert_eq!(ws.upstream_count, 1);
        assert_eq!(ws.match_ratio, 1.0);
        assert_relative_eq!(ws.area(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unmatched_single_source() {
        let g = network();
        let store = GeometryStore::from_records(vec![(1_i64, cell(0.0))]).unwrap();
        let ws = delineate(&4, &g, &store).unwrap();
        assert_eq!(ws.upstream_count, 1);
        assert_eq!(ws.match_ratio, 0.0);
    }

    #[test]
    fn test_unknown_source() {
        let g = network();
        let store = GeometryStore::<i64>::new();
        assert!(matches!(delineate(&99, &g, &store), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn test_coverage_threshold() {
        let g = network();
        let store =
            GeometryStore::from_records(vec![(1_i64, cell(0.0)), (2, cell(1.0)), (3, cell(2.0))]).unwrap();
        let lenient = DelineateParams {
            coverage_threshold: 0.5,
        };
        let ws = delineate_with(&1, &g, &store, &lenient).unwrap();
        assert!(ws.coverage_warning.is_none());

        let invalid = DelineateParams {
            coverage_threshold: 1.5,
        };
        assert!(matches!(
            delineate_with(&1, &g, &store, &invalid),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_mixed_polygon_and_multipolygon() {
        let g = network();
        let multi = Geometry::MultiPolygon(MultiPolygon::new(vec![
            polygon![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0)],
            polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 6.0)],
        ]));
        let store = GeometryStore::from_records(vec![(1_i64, cell(0.0)), (2, multi)]).unwrap();
        let ws = delineate(&1, &g, &store).unwrap();
        assert_relative_eq!(ws.area(), 3.0, epsilon = 1e-9);
        assert_eq!(ws.geometry.0.len(), 2);
    }

    #[test]
    fn test_algorithm_trait() {
        let g = network();
        let store = GeometryStore::from_records(vec![(1_i64, cell(0.0))]).unwrap();
        let algo = Delineation::new(&g, &store);
        assert_eq!(algo.name(), "Watershed");
        let ws = algo.execute_default(1).unwrap();
        assert_eq!(ws.source, 1);
        assert_relative_eq!(ws.match_ratio, 0.25);
    }
}
