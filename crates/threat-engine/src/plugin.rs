//! Video-frame adapter over the shared pipeline.
//!
//! Lets callers that speak the `VideoFrame`/`AiResult` envelope feed tracker
//! output in and get per-person cluster annotations back.

use crate::config::ThreatEngineConfig;
use crate::pipeline::ThreatPipeline;
use crate::SharedPipeline;
use anyhow::{bail, Context, Result};
use common::vision::{AiResult, Detection, PluginInfo, VideoFrame};
use common::FrameObservations;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const PLUGIN_ID: &str = "threat_assessment";
pub const OBSERVATIONS_FORMAT: &str = "observations+json";

/// Feeds frames of tracker/classifier output through a shared [`ThreatPipeline`].
///
/// Each frame's `data` carries a JSON [`FrameObservations`]. The result lists
/// every registered person with the cluster it belongs to and that cluster's
/// threat level.
#[derive(Clone)]
pub struct ThreatAssessmentPlugin {
    pipeline: SharedPipeline,
}

impl ThreatAssessmentPlugin {
    pub fn new(pipeline: SharedPipeline) -> Self {
        Self { pipeline }
    }

    /// Plugin owning a fresh pipeline without sinks
    pub fn standalone(config: ThreatEngineConfig) -> Result<Self> {
        let pipeline = ThreatPipeline::new(config, Default::default())?;
        Ok(Self::new(Arc::new(Mutex::new(pipeline))))
    }

    pub fn pipeline(&self) -> &SharedPipeline {
        &self.pipeline
    }

    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            id: PLUGIN_ID.to_string(),
            name: "Threat Assessment".to_string(),
            description: "Groups nearby people into interaction clusters and rates each cluster GREEN, YELLOW or RED".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_schema: Some(config_schema()),
            supported_formats: vec![OBSERVATIONS_FORMAT.to_string()],
        }
    }

    /// Apply a partial config on top of the running one.
    ///
    /// Only the keys present in `overrides` change; `null` leaves everything
    /// as it is. The result is validated before the pipeline sees it.
    pub async fn configure(&self, overrides: Value) -> Result<ThreatEngineConfig> {
        let mut pipeline = self.pipeline.lock().await;
        if overrides.is_null() {
            return Ok(pipeline.config().clone());
        }

        let Value::Object(overrides) = overrides else {
            bail!("threat assessment config must be a JSON object");
        };
        let mut merged = serde_json::to_value(pipeline.config())
            .context("failed to serialize current config")?;
        if let Value::Object(current) = &mut merged {
            current.extend(overrides);
        }

        let config: ThreatEngineConfig =
            serde_json::from_value(merged).context("invalid threat assessment config")?;
        pipeline.apply_config(config)?;

        let config = pipeline.config().clone();
        tracing::info!(
            cluster_threshold = config.cluster_threshold,
            frames_per_tick = config.frames_per_tick,
            camera_id = %config.camera_id,
            "threat assessment configured"
        );
        Ok(config)
    }

    pub async fn process_frame(&self, frame: &VideoFrame) -> Result<AiResult> {
        let start = std::time::Instant::now();
        let observations = parse_observations(frame)?;

        let mut pipeline = self.pipeline.lock().await;
        let outcome = pipeline.process_frame(&observations).await?;
        let snapshot = pipeline.snapshot();
        drop(pipeline);

        let membership: HashMap<_, _> = outcome
            .assessment
            .clusters
            .iter()
            .flat_map(|c| c.members.iter().map(move |id| (id, c)))
            .collect();

        let detections = snapshot
            .nodes()
            .iter()
            .map(|node| {
                let cluster = membership.get(&node.id);
                Detection {
                    class: "person".to_string(),
                    confidence: 1.0,
                    bbox: node.bbox,
                    metadata: Some(json!({
                        "track_id": node.id,
                        "cluster": cluster.map(|c| c.ordinal),
                        "threat": cluster.map(|c| c.threat),
                        "gender": node.gender,
                        "gesture": node.gesture,
                    })),
                }
            })
            .collect();

        Ok(AiResult {
            source_id: frame.source_id.clone(),
            timestamp: frame.timestamp,
            plugin_type: PLUGIN_ID.to_string(),
            detections,
            processing_time_ms: Some(start.elapsed().as_millis() as u64),
            metadata: Some(json!({
                "frame": outcome.frame,
                "ingest": outcome.ingest,
                "clusters": outcome.assessment.clusters.len(),
                "most_severe_gesture": outcome.assessment.most_severe_gesture,
                "tick": outcome.report.as_ref().map(|r| r.tick),
                "sink_failures": outcome.sink_failures,
            })),
        })
    }
}

fn parse_observations(frame: &VideoFrame) -> Result<FrameObservations> {
    if frame.format != OBSERVATIONS_FORMAT {
        bail!(
            "unsupported frame format '{}', expected '{}'",
            frame.format,
            OBSERVATIONS_FORMAT
        );
    }

    let mut observations: FrameObservations =
        serde_json::from_str(&frame.data).context("frame data is not valid observations JSON")?;

    // the envelope is authoritative for timing and geometry when the payload omits them
    if observations.timestamp == 0 {
        observations.timestamp = frame.timestamp;
    }
    if observations.width == 0 || observations.height == 0 {
        observations.width = frame.width;
        observations.height = frame.height;
    }

    Ok(observations)
}

fn config_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "cluster_threshold": {
                "type": "number",
                "exclusiveMinimum": 0,
                "default": 150.0,
                "description": "Center distance in pixels below which two people are linked"
            },
            "red_distance": {
                "type": "number",
                "exclusiveMinimum": 0,
                "default": 100.0,
                "description": "Distance below which a RED gesture escalates its cluster"
            },
            "yellow_distance": {
                "type": "number",
                "exclusiveMinimum": 0,
                "default": 200.0,
                "description": "Distance below which a YELLOW gesture escalates its cluster"
            },
            "frames_per_tick": {
                "type": "integer",
                "minimum": 1,
                "default": 30,
                "description": "Frames between reports"
            },
            "person_confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "default": 0.3
            },
            "camera_id": {"type": "string", "default": "CAM_02"},
            "incident_mode": {
                "type": "string",
                "enum": ["per_tick", "per_cluster"],
                "default": "per_tick"
            },
            "policy_overrides": {
                "type": "object",
                "additionalProperties": {"type": "string", "enum": ["GREEN", "YELLOW", "RED"]},
                "description": "Gesture label to threat level replacements"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Gesture, PixelRect, ThreatLevel, TrackId, TrackObservation};

    fn frame(tracks: Vec<TrackObservation>) -> VideoFrame {
        let observations = FrameObservations {
            timestamp: 0,
            width: 0,
            height: 0,
            tracks,
        };
        VideoFrame {
            source_id: "CAM_02".to_string(),
            timestamp: 1_700_000_000_000,
            sequence: 1,
            width: 1280,
            height: 720,
            format: OBSERVATIONS_FORMAT.to_string(),
            data: serde_json::to_string(&observations).unwrap(),
        }
    }

    fn person(id: &str, x: i64, gesture: Gesture) -> TrackObservation {
        TrackObservation {
            track_id: TrackId::from(id),
            bbox: PixelRect::new(x, 200, 40, 100),
            confirmed: true,
            gender: None,
            gesture: Some(gesture),
        }
    }

    #[tokio::test]
    async fn test_process_frame_annotates_people() {
        let plugin = ThreatAssessmentPlugin::standalone(ThreatEngineConfig::default()).unwrap();
        let result = plugin
            .process_frame(&frame(vec![
                person("1", 100, Gesture::Punching),
                person("2", 150, Gesture::Walking),
                person("3", 800, Gesture::Sitting),
            ]))
            .await
            .unwrap();

        assert_eq!(result.plugin_type, "threat_assessment");
        assert_eq!(result.detections.len(), 3);

        let first = result.detections[0].metadata.as_ref().unwrap();
        assert_eq!(first["track_id"], "1");
        assert_eq!(first["cluster"], 1);
        assert_eq!(first["threat"], serde_json::to_value(ThreatLevel::Red).unwrap());

        let third = result.detections[2].metadata.as_ref().unwrap();
        assert_eq!(third["cluster"], 2);
        assert_eq!(third["threat"], "GREEN");

        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["frame"], 1);
        assert_eq!(metadata["most_severe_gesture"], "PUNCHING");
    }

    #[tokio::test]
    async fn test_rejects_other_formats() {
        let plugin = ThreatAssessmentPlugin::standalone(ThreatEngineConfig::default()).unwrap();
        let mut jpeg = frame(vec![]);
        jpeg.format = "jpeg".to_string();
        assert!(plugin.process_frame(&jpeg).await.is_err());

        let mut garbage = frame(vec![]);
        garbage.data = "{not json".to_string();
        assert!(plugin.process_frame(&garbage).await.is_err());
    }

    #[tokio::test]
    async fn test_configure_applies_config() {
        let plugin = ThreatAssessmentPlugin::standalone(ThreatEngineConfig::default()).unwrap();
        plugin
            .configure(json!({"frames_per_tick": 1, "camera_id": "CAM_09"}))
            .await
            .unwrap();

        let result = plugin.process_frame(&frame(vec![])).await.unwrap();
        assert_eq!(result.metadata.unwrap()["tick"], 1);
        assert_eq!(plugin.pipeline().lock().await.config().camera_id, "CAM_09");

        assert!(plugin.configure(json!({"frames_per_tick": 0})).await.is_err());
        assert!(plugin.configure(json!([1, 2])).await.is_err());
    }

    #[tokio::test]
    async fn test_partial_config_keeps_running_values() {
        let running = ThreatEngineConfig {
            camera_id: "CAM_17".to_string(),
            cluster_threshold: 90.0,
            incident_webhook_url: Some("http://alerts:8085/api/alerts".to_string()),
            ..Default::default()
        };
        let plugin = ThreatAssessmentPlugin::standalone(running).unwrap();

        let config = plugin.configure(json!({"frames_per_tick": 5})).await.unwrap();

        assert_eq!(config.frames_per_tick, 5);
        assert_eq!(config.camera_id, "CAM_17");
        assert_eq!(config.cluster_threshold, 90.0);
        assert_eq!(
            config.incident_webhook_url.as_deref(),
            Some("http://alerts:8085/api/alerts")
        );

        let unchanged = plugin.configure(Value::Null).await.unwrap();
        assert_eq!(unchanged.frames_per_tick, 5);
    }
}
