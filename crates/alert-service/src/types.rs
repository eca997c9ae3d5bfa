use chrono::NaiveTime;
use common::{Gesture, IncidentRecord};
use serde::{Deserialize, Serialize};

/// Time-of-day format used by incident logs and operator DTOs
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One incident on the alert timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub timestamp: NaiveTime,
    pub camera_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "gestureTag")]
    pub gesture: Gesture,
}

impl From<&IncidentRecord> for AlertRecord {
    fn from(record: &IncidentRecord) -> Self {
        Self {
            timestamp: record.timestamp.time(),
            camera_id: record.camera_id.clone(),
            latitude: record.location.latitude,
            longitude: record.location.longitude,
            gesture: record.gesture.clone(),
        }
    }
}

/// Alert as served to the operator map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDto {
    /// Camera the alert came from
    #[serde(rename = "id")]
    pub camera_id: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    pub severity: f64,
    /// `HH:MM:SS`
    pub time: String,
    pub description: String,
}

/// Scoring inputs for one gesture, each on a 0..=10 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureMetadata {
    pub gesture: Gesture,
    pub description: String,
    pub aggression: u8,
    pub proximity: u8,
    pub movement: u8,
}

impl GestureMetadata {
    pub fn new(
        gesture: Gesture,
        description: impl Into<String>,
        aggression: u8,
        proximity: u8,
        movement: u8,
    ) -> Self {
        Self {
            gesture,
            description: description.into(),
            aggression,
            proximity,
            movement,
        }
    }

    /// Weighted severity: aggression counts most, movement least
    pub fn severity(&self) -> f64 {
        0.5 * f64::from(self.aggression)
            + 0.3 * f64::from(self.proximity)
            + 0.2 * f64::from(self.movement)
    }
}
