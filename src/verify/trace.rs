//! JSON-lines command traces.
//!
//! One record per line: the time stamp followed by the raw command fields.
//!
//! ```text
//! {"time":120000,"code":3,"bank":2,"address":16}
//! {"time":150000,"code":5,"bank":2,"address":8}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::command::RawCommand;
use crate::common::error::TraceError;
use crate::verify::model::{CheckReport, ProtocolModel};

/// One time-stamped channel cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub time: u64,
    #[serde(flatten)]
    pub raw: RawCommand,
}

/// Parses a trace from any buffered reader.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<TraceEntry>, TraceError> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(text).map_err(|source| TraceError::Json {
            line: index + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Reads a trace file.
pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<TraceEntry>, TraceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| TraceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(BufReader::new(file))
}

/// Feeds a trace through the protocol model.
pub fn check_trace(entries: &[TraceEntry], model: &mut ProtocolModel) -> CheckReport {
    for entry in entries {
        model.observe(entry.time, &entry.raw);
    }
    model.report()
}

/// Streams trace records to a writer.
pub struct TraceWriter<W: Write> {
    out: BufWriter<W>,
}

impl TraceWriter<File> {
    /// Creates (or truncates) a trace file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file))
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: BufWriter::new(inner),
        }
    }

    pub fn write(&mut self, entry: &TraceEntry) -> Result<(), TraceError> {
        serde_json::to_writer(&mut self.out, entry)
            .map_err(|source| TraceError::Json { line: 0, source })?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), TraceError> {
        self.out.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, TraceError> {
        self.out.into_inner().map_err(|err| err.into_error().into())
    }
}
