//! Report records emitted once per tick.
//!
//! `ClusterRecord` describes one interaction cluster; `IncidentRecord` is the
//! camera-wide summary consumed by the alert service.

use crate::observations::{Gender, Gesture, ThreatLevel, TrackId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Camera location, passed through unmodified into incident records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One cluster as reported at a tick boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Number of ticks elapsed when the record was emitted
    pub tick: u64,

    /// 1-based position of the cluster in this tick's cluster sequence
    pub cluster_id: usize,

    pub threat: ThreatLevel,

    pub node_ids: Vec<TrackId>,

    /// Per-member gender, `None` until classified
    pub genders: Vec<Option<Gender>>,

    /// Per-member gesture, `None` until classified
    pub gestures: Vec<Option<Gesture>>,
}

/// Camera-wide "most concerning gesture" summary for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub timestamp: DateTime<Utc>,

    pub camera_id: String,

    pub location: GeoLocation,

    pub gesture: Gesture,
}
