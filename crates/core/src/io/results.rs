//! JSON-lines result sink

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Delineated,
    Unresolved,
    Failed,
    Cancelled,
}

/// One output line per query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub label: String,
    pub source: Option<String>,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub match_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub matched_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub upstream_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub geometry: Option<Geometry<f64>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ResultRecord {
    /// A record with only the identifying fields and a status.
    pub fn bare(label: impl Into<String>, source: Option<String>, status: ResultStatus) -> Self {
        Self {
            label: label.into(),
            source,
            status,
            match_ratio: None,
            matched_count: None,
            upstream_count: None,
            area: None,
            geometry: None,
            error: None,
        }
    }
}

/// Writes [`ResultRecord`]s as newline-delimited JSON.
pub struct ResultWriter<W: Write> {
    inner: W,
    written: usize,
}

impl ResultWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write(&mut self, record: &ResultRecord) -> Result<()> {
        serde_json::to_writer(&mut self.inner, record)?;
        self.inner.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush and return the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.inner.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;

    #[test]
    fn test_json_lines() {
        let mut buf = Vec::new();
        let mut writer = ResultWriter::new(&mut buf);

        let mut ok = ResultRecord::bare("A", Some("1".into()), ResultStatus::Delineated);
        ok.match_ratio = Some(0.75);
        ok.geometry = Some(Geometry::Point(point!(x: 1.0, y: 2.0)));
        writer.write(&ok).unwrap();
        writer
            .write(&ResultRecord::bare("B", None, ResultStatus::Unresolved))
            .unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: ResultRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, ok);
        assert_eq!(
            lines[1],
            r#"{"label":"B","source":null,"status":"unresolved"}"#
        );
    }
}
