//! Error types for cuenca

use std::fmt;

use thiserror::Error;

/// Main error type for cuenca operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A flow row references a malformed or unparseable node id.
    /// Fatal to graph construction.
    #[error("Invalid edge ({upstream} -> {downstream}): {reason}")]
    InvalidEdge {
        upstream: String,
        downstream: String,
        reason: String,
    },

    /// The query source is not a member of the network graph.
    /// Recoverable per query point.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A catchment record carries a geometry that is neither a polygon nor
    /// a multi-polygon. Signals that the wrong dataset was supplied.
    #[error("Unexpected geometry type for node {id}: {found} (expected Polygon or MultiPolygon)")]
    GeometryType { id: String, found: &'static str },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn unknown_node(id: impl fmt::Display) -> Self {
        Error::UnknownNode(id.to_string())
    }

    /// Errors that abort a whole run rather than a single query point.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnknownNode(_))
    }
}

/// Result type alias for cuenca operations
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal notice that part of a watershed has no catchment polygon.
///
/// Produced whenever the match ratio falls below the configured threshold.
/// It never aborts anything; callers log or report it.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialCoverageWarning {
    pub source: String,
    pub matched: usize,
    pub queried: usize,
}

impl PartialCoverageWarning {
    pub fn match_ratio(&self) -> f64 {
        if self.queried == 0 {
            0.0
        } else {
            self.matched as f64 / self.queried as f64
        }
    }

    pub fn missing(&self) -> usize {
        self.queried - self.matched
    }
}

impl fmt::Display for PartialCoverageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partial coverage for {}: {} of {} upstream segments have a catchment ({:.1}%)",
            self.source,
            self.matched,
            self.queried,
            100.0 * self.match_ratio()
        )
    }
}
