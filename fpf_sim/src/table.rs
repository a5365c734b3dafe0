//! CSV tables: traffic in, conflict metrics out.
//!
//! ```text
//! in:  time,callsign,latitude,longitude,ground_speed,heading,status
//! out: time,callsign,fpf
//! ```
//!
//! An empty `status` field reads as a missing label. Failed aircraft are
//! written with `NaN` in the `fpf` column.

use fpf_core::{ConflictRecord, TrafficRow};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors reading or writing a table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One row of the output table.
#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    time: f64,
    callsign: &'a str,
    fpf: f64,
}

/// Reads a traffic table. Rows that do not parse are logged and skipped.
pub fn read_traffic(reader: impl io::Read) -> Result<Vec<TrafficRow>, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Fail on a table without the expected columns, not row by row
    csv_reader.headers()?;

    let mut rows = Vec::new();
    for (line, res) in csv_reader.deserialize::<TrafficRow>().enumerate() {
        match res {
            Ok(row) => rows.push(row),
            Err(e) => warn!("skipping traffic row {}: {}", line + 1, e),
        }
    }
    Ok(rows)
}

pub fn read_traffic_file(path: impl AsRef<Path>) -> Result<Vec<TrafficRow>, TableError> {
    read_traffic(File::open(path)?)
}

/// Writes a traffic table (e.g. generated scenario traffic).
pub fn write_traffic(writer: impl io::Write, rows: &[TrafficRow]) -> Result<(), TableError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_traffic_file(path: impl AsRef<Path>, rows: &[TrafficRow]) -> Result<(), TableError> {
    write_traffic(File::create(path)?, rows)
}

/// Writes the `time,callsign,fpf` output table.
pub fn write_records(writer: impl io::Write, records: &[ConflictRecord]) -> Result<(), TableError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(OutputRow {
            time: record.time,
            callsign: &record.callsign,
            fpf: record.fpf,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_records_file(path: impl AsRef<Path>, records: &[ConflictRecord]) -> Result<(), TableError> {
    write_records(File::create(path)?, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_traffic_with_missing_status() {
        let csv = "\
time,callsign,latitude,longitude,ground_speed,heading,status
0.0,AAL1,33.43,-112.01,12.5,90.0,TAXI
1.0,DAL2,33.44,-112.02,0.0,0.0,
";
        let rows = read_traffic(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status.as_deref(), Some("TAXI"));
        assert_eq!(rows[0].ground_speed, 12.5);
        assert_eq!(rows[1].status, None);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let csv = "\
time,callsign,latitude,longitude,ground_speed,heading,status
0.0,AAL1,33.43,-112.01,12.5,90.0,TAXI
oops,DAL2,33.44,-112.02,0.0,0.0,TAXI
";
        let rows = read_traffic(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].callsign, "AAL1");
    }

    #[test]
    fn test_traffic_round_trip() {
        let rows = vec![TrafficRow::new(5.0, "N1", 40.0, -74.0, 10.0, 45.0, "PUSHBACK")];
        let mut buf = Vec::new();
        write_traffic(&mut buf, &rows).unwrap();

        assert_eq!(read_traffic(buf.as_slice()).unwrap(), rows);
    }

    #[test]
    fn test_write_records() {
        let records = vec![
            ConflictRecord {
                time: 10.0,
                callsign: "A".to_string(),
                fpf: 0.5,
                intruders: 1,
                in_conflict: false,
            },
            ConflictRecord::failed(10.0, "B"),
        ];
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["time,callsign,fpf", "10.0,A,0.5", "10.0,B,NaN"]);
    }
}
