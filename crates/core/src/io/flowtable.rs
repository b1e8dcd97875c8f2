//! Flow table CSV reader

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::error::{Error, Result};
use crate::network::{NetworkGraph, NodeKey};

/// Column layout of a flow table.
///
/// Defaults match the enhanced NHDPlusV2 flow table (`comid`, `tocomid`,
/// terminal flows marked with `0`).
#[derive(Debug, Clone)]
pub struct FlowTableOptions {
    pub id_column: String,
    pub to_column: String,
    /// Downstream value meaning "leaves the network"
    pub sentinel: String,
}

impl Default for FlowTableOptions {
    fn default() -> Self {
        Self {
            id_column: "comid".to_string(),
            to_column: "tocomid".to_string(),
            sentinel: "0".to_string(),
        }
    }
}

/// Read a flow table CSV into a [`NetworkGraph`].
pub fn read_flow_table<K, P>(path: P, options: &FlowTableOptions) -> Result<NetworkGraph<K>>
where
    K: NodeKey + FromStr,
    <K as FromStr>::Err: std::fmt::Display,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let graph = read_flow_table_from_reader(BufReader::new(file), options)?;
    info!(
        "Flow table {}: {} segments, {} flow links",
        path.as_ref().display(),
        graph.len(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Same as [`read_flow_table`] over any reader.
pub fn read_flow_table_from_reader<K, R>(
    reader: R,
    options: &FlowTableOptions,
) -> Result<NetworkGraph<K>>
where
    K: NodeKey + FromStr,
    <K as FromStr>::Err: std::fmt::Display,
    R: Read,
{
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidParameter {
                name: "column",
                value: name.to_string(),
                reason: format!("not found in flow table header [{}]", headers.iter().collect::<Vec<_>>().join(", ")),
            })
    };
    let id_col = column(&options.id_column)?;
    let to_col = column(&options.to_column)?;

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let id = record.get(id_col).unwrap_or_default().to_string();
        let to = record.get(to_col).unwrap_or_default().to_string();
        rows.push((id, to));
    }

    NetworkGraph::from_raw_records(rows, &options.sentinel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_flow_table() {
        let data = "comid,tocomid,other\n1,0,a\n2,1,b\n3,2,c\n4,2,d\n";
        let g: NetworkGraph<i64> =
            read_flow_table_from_reader(data.as_bytes(), &FlowTableOptions::default()).unwrap();
        assert_eq!(g.len(), 4);
        assert_eq!(g.edge_count(), 3);
        assert!(!g.has_node(&0));
    }

    #[test]
    fn test_header_is_case_insensitive() {
        let data = "COMID,TOCOMID\n10,0\n";
        let g: NetworkGraph<i64> =
            read_flow_table_from_reader(data.as_bytes(), &FlowTableOptions::default()).unwrap();
        assert!(g.has_node(&10));
    }

    #[test]
    fn test_missing_column() {
        let data = "id,downstream\n1,0\n";
        let err = read_flow_table_from_reader::<i64, _>(data.as_bytes(), &FlowTableOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "column", .. }));
    }

    #[test]
    fn test_malformed_id() {
        let data = "comid,tocomid\n1,0\n2,1.5\n";
        let err = read_flow_table_from_reader::<i64, _>(data.as_bytes(), &FlowTableOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEdge { .. }));
    }

    #[test]
    fn test_custom_columns() {
        let data = "seg,next\na,b\nb,END\n";
        let options = FlowTableOptions {
            id_column: "seg".into(),
            to_column: "next".into(),
            sentinel: "END".into(),
        };
        let g: NetworkGraph<String> = read_flow_table_from_reader(data.as_bytes(), &options).unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.edge_count(), 1);
    }
}
