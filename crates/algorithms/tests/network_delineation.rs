//! End-to-end delineation over a flow table and catchment layer parsed
//! from their on-disk formats.

use approx::assert_relative_eq;
use cuenca_algorithms::hydrology::{ancestors, delineate};
use cuenca_algorithms::vector::union_all;
use cuenca_core::io::{read_catchments_from_reader, read_flow_table_from_reader, FlowTableOptions};
use cuenca_core::{Error, GeometryStore, NetworkGraph};
use geo::{BooleanOps, MultiPolygon};
use std::collections::HashSet;

const FLOW_TABLE: &str = "\
COMID,TOCOMID
1,0
2,1
3,2
4,2
";

fn square(x: f64, y: f64) -> String {
    format!(
        r#"{{"Polygon":{{"exterior":[{{"x":{x0},"y":{y0}}},{{"x":{x1},"y":{y0}}},{{"x":{x1},"y":{y1}}},{{"x":{x0},"y":{y1}}},{{"x":{x0},"y":{y0}}}],"interiors":[]}}}}"#,
        x0 = x,
        x1 = x + 1.0,
        y0 = y,
        y1 = y + 1.0
    )
}

fn catchments_json(ids: &[(i64, f64, f64)]) -> String {
    let records: Vec<String> = ids
        .iter()
        .map(|(id, x, y)| format!(r#"{{"id":{},"geometry":{}}}"#, id, square(*x, *y)))
        .collect();
    format!("[{}]", records.join(","))
}

fn network() -> NetworkGraph<i64> {
    read_flow_table_from_reader(FLOW_TABLE.as_bytes(), &FlowTableOptions::default()).unwrap()
}

#[test]
fn test_ancestors_from_flow_table() {
    let g = network();
    assert_eq!(g.len(), 4);
    assert_eq!(ancestors(&1, &g).unwrap(), HashSet::from([2, 3, 4]));
    assert_eq!(ancestors(&2, &g).unwrap(), HashSet::from([3, 4]));
    assert!(ancestors(&3, &g).unwrap().is_empty());
}

#[test]
fn test_delineate_with_missing_catchment() {
    let g = network();
    // segment 4 has no polygon
    let json = catchments_json(&[(1, 0.0, 0.0), (2, 0.0, 1.0), (3, 0.0, 2.0)]);
    let store: GeometryStore<i64> = read_catchments_from_reader(json.as_bytes()).unwrap();

    let ws = delineate(&1, &g, &store).unwrap();
    assert_relative_eq!(ws.match_ratio, 0.75);
    assert_eq!(ws.matched_count, 3);
    assert_relative_eq!(ws.area(), 3.0, epsilon = 1e-9);
    assert!(ws.coverage_warning.is_some());
}

#[test]
fn test_delineate_is_deterministic() {
    let g = network();
    let json = catchments_json(&[(1, 0.0, 0.0), (2, 1.0, 0.0), (3, 2.0, 0.0), (4, 1.0, 1.0)]);
    let store: GeometryStore<i64> = read_catchments_from_reader(json.as_bytes()).unwrap();

    let first = delineate(&1, &g, &store).unwrap();
    let second = delineate(&1, &g, &store).unwrap();
    assert_eq!(first.geometry, second.geometry);
    assert_relative_eq!(first.area(), 4.0, epsilon = 1e-9);
}

#[test]
fn test_union_matches_any_input_order() {
    let json = catchments_json(&[(1, 0.0, 0.0), (2, 1.0, 0.0), (3, 0.5, 0.5)]);
    let store: GeometryStore<i64> = read_catchments_from_reader(json.as_bytes()).unwrap();
    let polys: Vec<&MultiPolygon<f64>> = [1, 2, 3].iter().filter_map(|id| store.get(id)).collect();

    let forward = union_all(polys.iter().copied());
    let backward = union_all(polys.iter().rev().copied());
    let diff: MultiPolygon<f64> = forward.xor(&backward);
    assert_relative_eq!(cuenca_algorithms::vector::area(&diff), 0.0, epsilon = 1e-9);
}

#[test]
fn test_unknown_source_is_recoverable() {
    let g = network();
    let store = GeometryStore::<i64>::new();
    let err = delineate(&42, &g, &store).unwrap_err();
    assert!(matches!(err, Error::UnknownNode(_)));
    assert!(!err.is_fatal());
}

#[test]
fn test_wrong_geometry_type_rejected() {
    let json = r#"[{"id":1,"geometry":{"Point":{"x":0.0,"y":0.0}}}]"#;
    let result: cuenca_core::Result<GeometryStore<i64>> = read_catchments_from_reader(json.as_bytes());
    assert!(matches!(result, Err(Error::GeometryType { .. })));
}
