//! Catchment polygon JSON reader/writer

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::network::NodeKey;
use crate::vector::{CatchmentRecord, GeometryStore};

/// Read a JSON array of catchment records into a [`GeometryStore`].
pub fn read_catchments<K, P>(path: P) -> Result<GeometryStore<K>>
where
    K: NodeKey + DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let store = read_catchments_from_reader(BufReader::new(file))?;
    info!("Catchments {}: {} polygons", path.as_ref().display(), store.len());
    if store.degenerate_count() > 0 {
        warn!("{} degenerate catchment polygons ignored", store.degenerate_count());
    }
    Ok(store)
}

pub fn read_catchments_from_reader<K, R>(reader: R) -> Result<GeometryStore<K>>
where
    K: NodeKey + DeserializeOwned,
    R: Read,
{
    let records: Vec<CatchmentRecord<K>> = serde_json::from_reader(reader)?;
    GeometryStore::from_catchments(records)
}

/// Write catchment records as a JSON array.
pub fn write_catchments<K, P>(records: &[CatchmentRecord<K>], path: P) -> Result<()>
where
    K: Serialize,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use geo_types::{polygon, Geometry};

    #[test]
    fn test_roundtrip_through_file() {
        let records = vec![
            CatchmentRecord {
                id: 1_i64,
                geometry: Geometry::Polygon(polygon![
                    (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)
                ]),
            },
            CatchmentRecord {
                id: 2_i64,
                geometry: Geometry::MultiPolygon(
                    vec![polygon![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0)]].into(),
                ),
            },
        ];

        let tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        write_catchments(&records, tmp.path()).unwrap();

        let store: GeometryStore<i64> = read_catchments(tmp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains(&1));
        assert!(store.contains(&2));
    }

    #[test]
    fn test_line_layer_is_rejected() {
        let json = r#"[{"id": 1, "geometry": {"LineString": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 1.0}]}}]"#;
        let err = read_catchments_from_reader::<i64, _>(json.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::GeometryType { found: "LineString", .. }));
    }
}
