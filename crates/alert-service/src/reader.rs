//! Incident log reader.
//!
//! The log has no header; each row is
//! `HH:MM:SS,camera_id,latitude,longitude,gesture`. Rows that do not parse are
//! skipped with a warning.

use crate::types::{AlertRecord, TIME_FORMAT};
use chrono::NaiveTime;
use common::Gesture;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const FIELDS: usize = 5;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read incident log: {0}")]
    Read(#[from] csv::Error),
}

pub fn read_alerts(path: impl AsRef<Path>) -> Result<Vec<AlertRecord>, ReaderError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ReaderError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let records = parse_alerts(file)?;
    debug!(path = %path.display(), count = records.len(), "incident log loaded");
    Ok(records)
}

pub fn parse_alerts<R: Read>(reader: R) -> Result<Vec<AlertRecord>, ReaderError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv.records().enumerate() {
        let line = index + 1;
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(line, error = %e, "skipping unreadable incident row");
                continue;
            }
        };

        match parse_row(&row) {
            Some(record) => records.push(record),
            None => warn!(line, row = ?row, "skipping malformed incident row"),
        }
    }
    Ok(records)
}

fn parse_row(row: &csv::StringRecord) -> Option<AlertRecord> {
    if row.len() < FIELDS {
        return None;
    }

    let gesture = row.get(4)?;
    if gesture.is_empty() {
        return None;
    }

    Some(AlertRecord {
        timestamp: parse_time(row.get(0)?)?,
        camera_id: row.get(1)?.to_string(),
        latitude: row.get(2)?.parse().ok()?,
        longitude: row.get(3)?.parse().ok()?,
        gesture: Gesture::from(gesture.to_string()),
    })
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S%.f"))
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_rows() {
        let input = "21:07:05,CAM_02,21.162730643915978,75.42720938667607,PUNCHING\n\
                     21:07:06,CAM_02,21.1627,75.4272,staring\n";

        let records = parse_alerts(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, NaiveTime::from_hms_opt(21, 7, 5).unwrap());
        assert_eq!(records[0].camera_id, "CAM_02");
        assert_eq!(records[0].latitude, 21.162730643915978);
        assert_eq!(records[0].gesture, Gesture::Punching);
        assert_eq!(records[1].gesture, Gesture::Staring);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let input = "not-a-time,CAM_01,1.0,2.0,PUNCHING\n\
                     10:00:00,CAM_01,1.0\n\
                     10:00:01,CAM_01,north,2.0,PUNCHING\n\
                     10:00:02,CAM_01,1.0,2.0,\n\
                     \n\
                     10:00:03,CAM_01,1.0,2.0,HOVERING\n";

        let records = parse_alerts(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].gesture, Gesture::Hovering);
    }

    #[test]
    fn test_unknown_gesture_is_kept_as_label() {
        let records = parse_alerts("10:00:00,CAM_01,1.0,2.0,kicking\n".as_bytes()).unwrap();
        assert_eq!(records[0].gesture, Gesture::Other("KICKING".to_string()));
    }

    #[test]
    fn test_short_time_format() {
        let records = parse_alerts("09:15,CAM_03,1.0,2.0,FALLING\n".as_bytes()).unwrap();
        assert_eq!(records[0].timestamp, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
    }

    #[test]
    fn test_read_alerts_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "12:00:00,CAM_09,3.0,4.0,CHASING").unwrap();
        file.flush().unwrap();

        let records = read_alerts(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].camera_id, "CAM_09");
    }

    #[test]
    fn test_missing_file() {
        let err = read_alerts("/nonexistent/gesture_log.csv").unwrap_err();
        assert!(matches!(err, ReaderError::Open { .. }));
    }
}
