//! Edge files
//!
//! CSV with a `time` column (seconds) and an optional `level` column holding
//! the line level after the edge. Lines starting with `#` are ignored.

use std::io::{
    Read,
    Write,
};

use ltc::EdgeEvent;
use serde::{
    Deserialize,
    Serialize,
};

use crate::Error;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct EdgeRecord {
    time: f64,
    #[serde(default)]
    level: Option<u8>,
}

pub fn read_timestamps<R: Read>(reader: R) -> Result<Vec<f64>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let timestamps = reader
        .deserialize::<EdgeRecord>()
        .map(|record| Ok(record?.time))
        .collect::<Result<Vec<_>, Error>>()?;
    tracing::debug!(num_edges = timestamps.len(), "Read edges");

    Ok(timestamps)
}

/// Writes the line state at `start`, followed by one record per edge. Returns
/// the number of edges written.
pub fn write_edges<W, I>(writer: W, start: f64, edges: I) -> Result<usize, Error>
where
    W: Write,
    I: IntoIterator<Item = EdgeEvent>,
{
    let mut writer = csv::Writer::from_writer(writer);

    let mut level = 0;
    writer.serialize(EdgeRecord {
        time: start,
        level: Some(level),
    })?;

    let mut num_edges = 0;
    for edge in edges {
        level ^= 1;
        writer.serialize(EdgeRecord {
            time: edge.time,
            level: Some(level),
        })?;
        num_edges += 1;
    }

    writer.flush()?;
    tracing::debug!(num_edges, "Wrote edges");

    Ok(num_edges)
}
