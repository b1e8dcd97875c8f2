//! Thin adapters for the external data sources and the result sink.
//!
//! - Flow tables: CSV with an id column and a downstream-id column
//! - Catchments: JSON array of `{ "id": .., "geometry": .. }` records
//! - Query points: CSV `label,source` (empty `source` = unresolved)
//! - Results: JSON lines, one record per query point

mod catchments;
mod flowtable;
mod queries;
mod results;

pub use catchments::{read_catchments, read_catchments_from_reader, write_catchments};
pub use flowtable::{read_flow_table, read_flow_table_from_reader, FlowTableOptions};
pub use queries::{read_queries, read_queries_from_reader, QueryRecord};
pub use results::{ResultRecord, ResultStatus, ResultWriter};
