use crate::error::ConfigError;
use common::{GeoLocation, Gesture, ThreatLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// How many incident records a tick produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentMode {
    /// Exactly one incident record per tick
    #[default]
    PerTick,
    /// One identical incident record per cluster, for parity with legacy logs
    PerCluster,
}

impl FromStr for IncidentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_tick" | "tick" => Ok(IncidentMode::PerTick),
            "per_cluster" | "cluster" => Ok(IncidentMode::PerCluster),
            _ => Err(format!("Invalid incident mode: {}", s)),
        }
    }
}

/// Tunables for clustering, scoring and reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatEngineConfig {
    /// Pairs closer than this (center distance, pixels) are linked into one cluster
    #[serde(default = "default_cluster_threshold")]
    pub cluster_threshold: f64,

    /// Pairs closer than this escalate to RED when either member is RED
    #[serde(default = "default_red_distance")]
    pub red_distance: f64,

    /// Pairs closer than this escalate to YELLOW when either member is YELLOW
    #[serde(default = "default_yellow_distance")]
    pub yellow_distance: f64,

    /// Frames per reporting tick; match this to the source frame rate
    #[serde(default = "default_frames_per_tick")]
    pub frames_per_tick: u64,

    /// Minimum detector confidence for a person detection
    #[serde(default = "default_person_confidence")]
    pub person_confidence: f32,

    #[serde(default = "default_camera_id")]
    pub camera_id: String,

    #[serde(default = "default_location")]
    pub location: GeoLocation,

    #[serde(default)]
    pub incident_mode: IncidentMode,

    /// Per-gesture replacements for the built-in threat table
    #[serde(default)]
    pub policy_overrides: HashMap<Gesture, ThreatLevel>,

    #[serde(default = "default_cluster_log_path")]
    pub cluster_log_path: PathBuf,

    #[serde(default = "default_incident_log_path")]
    pub incident_log_path: PathBuf,

    /// Alert service endpoint that receives incident records
    #[serde(default)]
    pub incident_webhook_url: Option<String>,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_cluster_threshold() -> f64 {
    150.0
}

fn default_red_distance() -> f64 {
    100.0
}

fn default_yellow_distance() -> f64 {
    200.0
}

fn default_frames_per_tick() -> u64 {
    30
}

fn default_person_confidence() -> f32 {
    0.3
}

fn default_camera_id() -> String {
    "CAM_02".to_string()
}

fn default_location() -> GeoLocation {
    GeoLocation::new(21.162730643915978, 75.42720938667607)
}

fn default_cluster_log_path() -> PathBuf {
    PathBuf::from("output_log.csv")
}

fn default_incident_log_path() -> PathBuf {
    PathBuf::from("gesture_log.csv")
}

fn default_bind_addr() -> String {
    "0.0.0.0:8086".to_string()
}

impl Default for ThreatEngineConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: default_cluster_threshold(),
            red_distance: default_red_distance(),
            yellow_distance: default_yellow_distance(),
            frames_per_tick: default_frames_per_tick(),
            person_confidence: default_person_confidence(),
            camera_id: default_camera_id(),
            location: default_location(),
            incident_mode: IncidentMode::default(),
            policy_overrides: HashMap::new(),
            cluster_log_path: default_cluster_log_path(),
            incident_log_path: default_incident_log_path(),
            incident_webhook_url: None,
            bind_addr: default_bind_addr(),
        }
    }
}

impl ThreatEngineConfig {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_env("CLUSTER_THRESHOLD")? {
            config.cluster_threshold = v;
        }
        if let Some(v) = parse_env("RED_DISTANCE")? {
            config.red_distance = v;
        }
        if let Some(v) = parse_env("YELLOW_DISTANCE")? {
            config.yellow_distance = v;
        }
        if let Some(v) = parse_env("FRAMES_PER_TICK")? {
            config.frames_per_tick = v;
        }
        if let Some(v) = parse_env("PERSON_CONFIDENCE")? {
            config.person_confidence = v;
        }
        if let Ok(camera_id) = env::var("CAMERA_ID") {
            config.camera_id = camera_id;
        }
        if let Some(v) = parse_env("CAMERA_LATITUDE")? {
            config.location.latitude = v;
        }
        if let Some(v) = parse_env("CAMERA_LONGITUDE")? {
            config.location.longitude = v;
        }
        if let Some(v) = parse_env("INCIDENT_MODE")? {
            config.incident_mode = v;
        }
        if let Ok(path) = env::var("CLUSTER_LOG_PATH") {
            config.cluster_log_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("INCIDENT_LOG_PATH") {
            config.incident_log_path = PathBuf::from(path);
        }
        config.incident_webhook_url = env::var("INCIDENT_WEBHOOK_URL").ok();
        if let Ok(addr) = env::var("THREAT_ENGINE_ADDR") {
            config.bind_addr = addr;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames_per_tick == 0 {
            return Err(ConfigError::invalid("frames_per_tick", "must be at least 1"));
        }

        for (field, value) in [
            ("cluster_threshold", self.cluster_threshold),
            ("red_distance", self.red_distance),
            ("yellow_distance", self.yellow_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(field, format!("{} is not a positive distance", value)));
            }
        }

        if !(0.0..=1.0).contains(&self.person_confidence) {
            return Err(ConfigError::invalid(
                "person_confidence",
                format!("{} is outside 0.0..=1.0", self.person_confidence),
            ));
        }

        if self.red_distance > self.yellow_distance {
            tracing::warn!(
                red_distance = self.red_distance,
                yellow_distance = self.yellow_distance,
                "red distance exceeds yellow distance"
            );
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ThreatEngineConfig::default();
        assert_eq!(config.cluster_threshold, 150.0);
        assert_eq!(config.red_distance, 100.0);
        assert_eq!(config.yellow_distance, 200.0);
        assert_eq!(config.frames_per_tick, 30);
        assert_eq!(config.person_confidence, 0.3);
        assert_eq!(config.incident_mode, IncidentMode::PerTick);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config: ThreatEngineConfig = serde_json::from_value(serde_json::json!({
            "frames_per_tick": 25,
            "camera_id": "CAM_07",
            "incident_mode": "per_cluster",
            "policy_overrides": {"LOITERING": "RED"}
        }))
        .unwrap();

        assert_eq!(config.frames_per_tick, 25);
        assert_eq!(config.camera_id, "CAM_07");
        assert_eq!(config.cluster_threshold, 150.0);
        assert_eq!(config.incident_mode, IncidentMode::PerCluster);
        assert_eq!(
            config.policy_overrides.get(&Gesture::Loitering),
            Some(&ThreatLevel::Red)
        );
    }

    #[test]
    fn test_validate_rejects_zero_frames_per_tick() {
        let config = ThreatEngineConfig {
            frames_per_tick: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "frames_per_tick", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_distances() {
        let config = ThreatEngineConfig {
            cluster_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ThreatEngineConfig {
            red_distance: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_incident_mode_parse() {
        assert_eq!("per_tick".parse::<IncidentMode>().unwrap(), IncidentMode::PerTick);
        assert_eq!("CLUSTER".parse::<IncidentMode>().unwrap(), IncidentMode::PerCluster);
        assert!("hourly".parse::<IncidentMode>().is_err());
    }
}
