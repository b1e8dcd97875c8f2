//! Query point CSV reader

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::network::NodeKey;

/// A query point already resolved (or not) to its source segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord<K> {
    pub label: String,
    /// `None` when the point-to-segment join found no catchment
    pub source: Option<K>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    label: String,
    source: Option<String>,
}

/// Read `label,source` rows. An empty `source` field marks an unresolved
/// point; a non-empty field that does not parse as `K` is an error.
pub fn read_queries<K, P>(path: P) -> Result<Vec<QueryRecord<K>>>
where
    K: NodeKey + FromStr,
    <K as FromStr>::Err: std::fmt::Display,
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    read_queries_from_reader(BufReader::new(file))
}

pub fn read_queries_from_reader<K, R>(reader: R) -> Result<Vec<QueryRecord<K>>>
where
    K: NodeKey + FromStr,
    <K as FromStr>::Err: std::fmt::Display,
    R: Read,
{
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();

    for row in csv.deserialize() {
        let row: QueryRow = row?;
        let source = match row.source.as_deref() {
            None | Some("") => None,
            Some(s) => Some(s.parse::<K>().map_err(|e| Error::InvalidParameter {
                name: "source",
                value: s.to_string(),
                reason: format!("query {}: {}", row.label, e),
            })?),
        };
        out.push(QueryRecord {
            label: row.label,
            source,
        });
    }

    Ok(out)
}
