//! CSV log files.
//!
//! Cluster log: header `second,cluster_id,threat,node_ids,genders,gestures`,
//! list columns joined with commas, unclassified attributes left empty.
//! Incident log: headerless rows `HH:MM:SS,camera_id,latitude,longitude,gesture`,
//! the layout the alert service reads back.

use super::ReportSink;
use crate::error::SinkError;
use async_trait::async_trait;
use common::{ClusterRecord, IncidentRecord};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const CLUSTER_HEADER: [&str; 6] = [
    "second",
    "cluster_id",
    "threat",
    "node_ids",
    "genders",
    "gestures",
];

type SharedWriter = Arc<Mutex<csv::Writer<File>>>;

pub struct CsvLogSink {
    cluster_path: PathBuf,
    incident_path: PathBuf,
    clusters: SharedWriter,
    incidents: SharedWriter,
}

impl CsvLogSink {
    /// Open both logs for appending; the cluster header is written only to a new or empty file
    pub fn open(
        cluster_path: impl AsRef<Path>,
        incident_path: impl AsRef<Path>,
    ) -> Result<Self, SinkError> {
        let cluster_path = cluster_path.as_ref().to_path_buf();
        let incident_path = incident_path.as_ref().to_path_buf();

        let clusters = open_append(&cluster_path, Some(&CLUSTER_HEADER))?;
        let incidents = open_append(&incident_path, None)?;

        tracing::info!(
            cluster_log = %cluster_path.display(),
            incident_log = %incident_path.display(),
            "csv logs opened"
        );

        Ok(Self {
            cluster_path,
            incident_path,
            clusters: Arc::new(Mutex::new(clusters)),
            incidents: Arc::new(Mutex::new(incidents)),
        })
    }

    pub fn cluster_path(&self) -> &Path {
        &self.cluster_path
    }

    pub fn incident_path(&self) -> &Path {
        &self.incident_path
    }
}

fn open_append(path: &Path, header: Option<&[&str]>) -> Result<csv::Writer<File>, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if let (Some(header), true) = (header, is_empty) {
        writer.write_record(header)?;
        writer.flush()?;
    }

    Ok(writer)
}

fn join<T: AsRef<str>>(values: impl Iterator<Item = Option<T>>) -> String {
    values
        .map(|v| v.map(|s| s.as_ref().to_owned()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn cluster_row(record: &ClusterRecord) -> [String; 6] {
    [
        record.tick.to_string(),
        record.cluster_id.to_string(),
        record.threat.to_string(),
        join(record.node_ids.iter().map(|id| Some(id.as_str()))),
        join(record.genders.iter().map(|g| g.as_ref().map(|g| g.as_str()))),
        join(record.gestures.iter().map(|g| g.as_ref().map(|g| g.as_str()))),
    ]
}

pub fn incident_row(record: &IncidentRecord) -> [String; 5] {
    [
        record.timestamp.format("%H:%M:%S").to_string(),
        record.camera_id.clone(),
        record.location.latitude.to_string(),
        record.location.longitude.to_string(),
        record.gesture.to_string(),
    ]
}

async fn append<const N: usize>(writer: &SharedWriter, row: [String; N]) -> Result<(), SinkError> {
    let writer = writer.clone();
    tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
        let mut writer = writer
            .lock()
            .map_err(|_| SinkError::Unavailable("csv writer lock poisoned".to_string()))?;
        writer.write_record(&row)?;
        writer.flush()?;
        Ok(())
    })
    .await
    .map_err(|e| SinkError::Unavailable(format!("csv writer task failed: {}", e)))?
}

#[async_trait]
impl ReportSink for CsvLogSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn write_cluster(&self, record: &ClusterRecord) -> Result<(), SinkError> {
        append(&self.clusters, cluster_row(record)).await
    }

    async fn write_incident(&self, record: &IncidentRecord) -> Result<(), SinkError> {
        append(&self.incidents, incident_row(record)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{Gender, GeoLocation, Gesture, ThreatLevel, TrackId};

    fn cluster_record() -> ClusterRecord {
        ClusterRecord {
            tick: 1,
            cluster_id: 1,
            threat: ThreatLevel::Red,
            node_ids: vec![TrackId::from("7"), TrackId::from("8")],
            genders: vec![Some(Gender::Male), None],
            gestures: vec![Some(Gesture::Punching), Some(Gesture::Walking)],
        }
    }

    fn incident_record() -> IncidentRecord {
        IncidentRecord {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 21, 7, 5).unwrap(),
            camera_id: "CAM_02".to_string(),
            location: GeoLocation::new(21.162730643915978, 75.42720938667607),
            gesture: Gesture::Punching,
        }
    }

    #[test]
    fn test_rows() {
        assert_eq!(
            cluster_row(&cluster_record()),
            ["1", "1", "RED", "7,8", "male,", "PUNCHING,WALKING"].map(String::from)
        );
        assert_eq!(
            incident_row(&incident_record()),
            [
                "21:07:05",
                "CAM_02",
                "21.162730643915978",
                "75.42720938667607",
                "PUNCHING"
            ]
            .map(String::from)
        );
    }

    #[tokio::test]
    async fn test_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let cluster_path = dir.path().join("logs/output_log.csv");
        let incident_path = dir.path().join("gesture_log.csv");

        let sink = CsvLogSink::open(&cluster_path, &incident_path).unwrap();
        sink.write_cluster(&cluster_record()).await.unwrap();
        sink.write_incident(&incident_record()).await.unwrap();

        let clusters = std::fs::read_to_string(&cluster_path).unwrap();
        assert_eq!(
            clusters,
            "second,cluster_id,threat,node_ids,genders,gestures\n\
             1,1,RED,\"7,8\",\"male,\",\"PUNCHING,WALKING\"\n"
        );

        let incidents = std::fs::read_to_string(&incident_path).unwrap();
        assert_eq!(
            incidents,
            "21:07:05,CAM_02,21.162730643915978,75.42720938667607,PUNCHING\n"
        );
    }

    #[tokio::test]
    async fn test_reopen_appends_without_second_header() {
        let dir = tempfile::tempdir().unwrap();
        let cluster_path = dir.path().join("output_log.csv");
        let incident_path = dir.path().join("gesture_log.csv");

        for _ in 0..2 {
            let sink = CsvLogSink::open(&cluster_path, &incident_path).unwrap();
            sink.write_cluster(&cluster_record()).await.unwrap();
        }

        let clusters = std::fs::read_to_string(&cluster_path).unwrap();
        assert_eq!(clusters.matches("second,cluster_id").count(), 1);
        assert_eq!(clusters.lines().count(), 3);
    }
}
