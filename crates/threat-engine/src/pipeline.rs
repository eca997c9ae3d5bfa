//! The per-frame loop: ingest, snapshot, cluster, score, and report on tick boundaries.

use crate::aggregator::{ClusterAssessment, ThreatAggregator};
use crate::cluster::extract_clusters;
use crate::config::ThreatEngineConfig;
use crate::error::{ConfigError, IngestError};
use crate::ingest::{FrameIngestor, IngestSummary};
use crate::nodes::{NodeRegistry, RegistrySnapshot};
use crate::proximity::{compute_edges, ProximityEdge};
use crate::scheduler::{build_report, frame_time, IncidentSource, TickReport, TickScheduler};
use crate::sink::{ReportPublisher, SinkFailure, SinkSet};
use common::{FrameObservations, Gesture};
use serde::Serialize;
use std::time::Instant;
use telemetry::metrics::{
    THREAT_ENGINE_CLUSTERS, THREAT_ENGINE_CLUSTER_THREATS, THREAT_ENGINE_FRAMES,
    THREAT_ENGINE_TICKS, THREAT_ENGINE_TICK_DURATION, THREAT_ENGINE_TRACKED_NODES,
};

/// Clusters and threats computed from one registry snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameAssessment {
    pub frame: u64,
    /// Pairs closer than the cluster threshold
    pub links: Vec<ProximityEdge>,
    pub clusters: Vec<ClusterAssessment>,
    pub most_severe_gesture: Gesture,
}

/// Result of processing one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutcome {
    pub frame: u64,
    pub ingest: IngestSummary,
    pub assessment: FrameAssessment,
    /// Present when the frame closed a tick
    pub report: Option<TickReport>,
    /// Sink failures from earlier reports that surfaced since the last frame
    pub sink_failures: Vec<SinkFailure>,
}

#[derive(Debug)]
pub struct ThreatPipeline {
    config: ThreatEngineConfig,
    registry: NodeRegistry,
    scheduler: TickScheduler,
    ingestor: FrameIngestor,
    aggregator: ThreatAggregator,
    publisher: ReportPublisher,
    last_report: Option<TickReport>,
}

impl ThreatPipeline {
    pub fn new(config: ThreatEngineConfig, sinks: SinkSet) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            registry: NodeRegistry::new(),
            scheduler: TickScheduler::new(config.frames_per_tick),
            ingestor: FrameIngestor::new(config.person_confidence),
            aggregator: ThreatAggregator::from_config(&config),
            publisher: ReportPublisher::new(sinks),
            last_report: None,
            config,
        })
    }

    /// Replace tunables; the registry and frame counter are kept
    pub fn apply_config(&mut self, config: ThreatEngineConfig) -> Result<(), ConfigError> {
        config.validate()?;

        self.scheduler.set_frames_per_tick(config.frames_per_tick);
        self.ingestor = FrameIngestor::new(config.person_confidence);
        self.aggregator = ThreatAggregator::from_config(&config);
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &ThreatEngineConfig {
        &self.config
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.publisher.sink_names()
    }

    /// Wait for every submitted report to reach the sinks and return the
    /// failures not yet handed out with a frame outcome.
    pub async fn flush_reports(&self) -> Vec<SinkFailure> {
        self.publisher.flush().await
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.scheduler.frame_count()
    }

    pub fn ticks_elapsed(&self) -> u64 {
        self.scheduler.ticks_elapsed()
    }

    /// Clusters and threats for the registry as it stands
    pub fn assess(&self) -> FrameAssessment {
        self.assess_snapshot(&self.registry.snapshot(), self.scheduler.frame_count())
    }

    fn assess_snapshot(&self, snapshot: &RegistrySnapshot, frame: u64) -> FrameAssessment {
        let threshold = self.config.cluster_threshold;
        let edges = compute_edges(snapshot);
        let clusters = extract_clusters(snapshot, &edges, threshold);
        let most_severe_gesture = self.aggregator.most_severe_gesture(snapshot, &clusters);

        FrameAssessment {
            frame,
            clusters: self.aggregator.assess(snapshot, &clusters),
            links: edges.into_iter().filter(|e| e.distance < threshold).collect(),
            most_severe_gesture,
        }
    }

    /// Process one frame of observations.
    ///
    /// The registry is updated first; everything after works on a snapshot.
    /// On a tick boundary the report is queued for the sinks without waiting
    /// on them; sink failures come back in later outcomes instead of failing
    /// the frame.
    pub async fn process_frame(&mut self, frame: &FrameObservations) -> Result<FrameOutcome, IngestError> {
        let (index, tick) = self.scheduler.advance();
        let ingest = self.ingestor.fold_observations(&mut self.registry, frame, index)?;

        THREAT_ENGINE_FRAMES.inc();
        THREAT_ENGINE_TRACKED_NODES.set(self.registry.len() as i64);

        let started = Instant::now();
        let snapshot = self.registry.snapshot();
        let assessment = self.assess_snapshot(&snapshot, index);

        let Some(tick) = tick else {
            return Ok(FrameOutcome {
                frame: index,
                ingest,
                assessment,
                report: None,
                sink_failures: self.publisher.take_failures(),
            });
        };

        let source = IncidentSource {
            camera_id: self.config.camera_id.clone(),
            location: self.config.location,
            mode: self.config.incident_mode,
        };
        let report = build_report(
            tick,
            index,
            &snapshot,
            &assessment.clusters,
            &assessment.most_severe_gesture,
            frame_time(frame.timestamp),
            &source,
        );

        THREAT_ENGINE_TICKS.inc();
        THREAT_ENGINE_CLUSTERS.set(report.clusters.len() as i64);
        for cluster in &report.clusters {
            THREAT_ENGINE_CLUSTER_THREATS
                .with_label_values(&[cluster.threat.as_str()])
                .inc();
        }
        THREAT_ENGINE_TICK_DURATION.observe(started.elapsed().as_secs_f64());

        tracing::info!(
            tick,
            frame = index,
            nodes = snapshot.len(),
            clusters = report.clusters.len(),
            gesture = %assessment.most_severe_gesture,
            "tick reported"
        );

        self.last_report = Some(report.clone());
        self.publisher.submit(report.clone());

        Ok(FrameOutcome {
            frame: index,
            ingest,
            assessment,
            report: Some(report),
            sink_failures: self.publisher.take_failures(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::sink::{MemorySink, ReportSink};
    use async_trait::async_trait;
    use common::{ClusterRecord, IncidentRecord, PixelRect, ThreatLevel, TrackId, TrackObservation};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Takes seconds to accept an incident, like a webhook behind a dead proxy
    struct StallingSink {
        delay: Duration,
    }

    #[async_trait]
    impl ReportSink for StallingSink {
        fn name(&self) -> &str {
            "stalling"
        }

        async fn write_cluster(&self, _record: &ClusterRecord) -> Result<(), SinkError> {
            Ok(())
        }

        async fn write_incident(&self, _record: &IncidentRecord) -> Result<(), SinkError> {
            tokio::time::sleep(self.delay).await;
            Err(SinkError::Unavailable("timed out".to_string()))
        }
    }

    fn track(id: &str, x: i64, gesture: Gesture) -> TrackObservation {
        TrackObservation {
            track_id: TrackId::from(id),
            bbox: PixelRect::new(x, 100, 40, 80),
            confirmed: true,
            gender: None,
            gesture: Some(gesture),
        }
    }

    fn frame(tracks: Vec<TrackObservation>) -> FrameObservations {
        FrameObservations {
            timestamp: 1_700_000_000_000,
            width: 1280,
            height: 720,
            tracks,
        }
    }

    fn pipeline(frames_per_tick: u64) -> (ThreatPipeline, Arc<MemorySink>) {
        let memory = Arc::new(MemorySink::new(64));
        let config = ThreatEngineConfig {
            frames_per_tick,
            ..Default::default()
        };
        let pipeline = ThreatPipeline::new(config, SinkSet::new().with(memory.clone())).unwrap();
        (pipeline, memory)
    }

    #[tokio::test]
    async fn test_reports_only_on_tick_boundary() {
        let (mut pipeline, memory) = pipeline(3);
        let observations = frame(vec![
            track("1", 100, Gesture::Punching),
            track("2", 150, Gesture::Walking),
        ]);

        for expected_frame in 1..=2 {
            let outcome = pipeline.process_frame(&observations).await.unwrap();
            assert_eq!(outcome.frame, expected_frame);
            assert!(outcome.report.is_none());
            assert_eq!(outcome.assessment.clusters.len(), 1);
        }
        assert!(memory.clusters().await.is_empty());

        let outcome = pipeline.process_frame(&observations).await.unwrap();
        let report = outcome.report.unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(report.frame, 3);
        assert_eq!(report.clusters[0].threat, ThreatLevel::Red);
        assert_eq!(report.incidents[0].gesture, Gesture::Punching);
        assert!(outcome.sink_failures.is_empty());

        assert!(pipeline.flush_reports().await.is_empty());
        assert_eq!(memory.clusters().await.len(), 1);
        assert_eq!(memory.incidents().await.len(), 1);
        assert_eq!(pipeline.last_report().map(|r| r.tick), Some(1));
    }

    #[tokio::test]
    async fn test_assessment_every_frame_has_links() {
        let (mut pipeline, _) = pipeline(30);
        let outcome = pipeline
            .process_frame(&frame(vec![
                track("1", 100, Gesture::Staring),
                track("2", 220, Gesture::Walking),
                track("3", 900, Gesture::Walking),
            ]))
            .await
            .unwrap();

        let assessment = outcome.assessment;
        assert_eq!(assessment.links.len(), 1);
        assert_eq!(assessment.clusters.len(), 2);
        assert_eq!(assessment.clusters[0].threat, ThreatLevel::Yellow);
        assert_eq!(assessment.most_severe_gesture, Gesture::Staring);
    }

    #[tokio::test]
    async fn test_tracks_persist_when_not_observed() {
        let (mut pipeline, _) = pipeline(30);
        pipeline
            .process_frame(&frame(vec![track("1", 100, Gesture::Walking)]))
            .await
            .unwrap();
        pipeline
            .process_frame(&frame(vec![track("2", 600, Gesture::Walking)]))
            .await
            .unwrap();

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&TrackId::from("1")).unwrap().first_seen, 1);
        assert_eq!(snapshot.get(&TrackId::from("2")).unwrap().first_seen, 2);
    }

    #[tokio::test]
    async fn test_apply_config_keeps_state() {
        let (mut pipeline, _) = pipeline(30);
        pipeline
            .process_frame(&frame(vec![track("1", 100, Gesture::Loitering)]))
            .await
            .unwrap();

        let config = ThreatEngineConfig {
            frames_per_tick: 2,
            policy_overrides: [(Gesture::Loitering, ThreatLevel::Red)].into_iter().collect(),
            ..Default::default()
        };
        pipeline.apply_config(config).unwrap();

        let outcome = pipeline.process_frame(&frame(vec![])).await.unwrap();
        let report = outcome.report.unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(report.clusters[0].threat, ThreatLevel::Red);
        assert_eq!(pipeline.snapshot().len(), 1);

        let invalid = ThreatEngineConfig {
            frames_per_tick: 0,
            ..Default::default()
        };
        assert!(pipeline.apply_config(invalid).is_err());
        assert_eq!(pipeline.config().frames_per_tick, 2);
    }

    #[tokio::test]
    async fn test_slow_sink_does_not_stall_frames() {
        let config = ThreatEngineConfig {
            frames_per_tick: 1,
            ..Default::default()
        };
        let sinks = SinkSet::new().with(Arc::new(StallingSink {
            delay: Duration::from_secs(3),
        }));
        let shared = Arc::new(Mutex::new(ThreatPipeline::new(config, sinks).unwrap()));
        let observations = frame(vec![track("1", 100, Gesture::Punching)]);

        let first = shared.lock().await.process_frame(&observations).await.unwrap();
        assert_eq!(first.report.map(|r| r.tick), Some(1));

        let started = Instant::now();
        let second = shared.lock().await.process_frame(&observations).await.unwrap();
        assert_eq!(second.frame, 2);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_failures_surface_after_flush() {
        let config = ThreatEngineConfig {
            frames_per_tick: 1,
            ..Default::default()
        };
        let sinks = SinkSet::new().with(Arc::new(StallingSink {
            delay: Duration::from_millis(50),
        }));
        let mut pipeline = ThreatPipeline::new(config, sinks).unwrap();

        let outcome = pipeline
            .process_frame(&frame(vec![track("1", 100, Gesture::Punching)]))
            .await
            .unwrap();
        assert!(outcome.sink_failures.is_empty());

        let failures = pipeline.flush_reports().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].sink, "stalling");
        assert!(pipeline.flush_reports().await.is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ThreatEngineConfig {
            yellow_distance: 0.0,
            ..Default::default()
        };
        assert!(ThreatPipeline::new(config, SinkSet::new()).is_err());
    }
}
