use crate::error::IngestError;
use crate::nodes::Node;
use crate::pipeline::{FrameAssessment, FrameOutcome};
use crate::plugin::ThreatAssessmentPlugin;
use crate::scheduler::TickReport;
use crate::SharedPipeline;
use anyhow::Result;
use common::FrameObservations;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ThreatEngineState {
    inner: Arc<ThreatEngineStateInner>,
}

struct ThreatEngineStateInner {
    node_id: String,
    plugin: ThreatAssessmentPlugin,
    pipeline: SharedPipeline,
}

impl ThreatEngineState {
    pub fn new(node_id: String, pipeline: SharedPipeline) -> Self {
        Self {
            inner: Arc::new(ThreatEngineStateInner {
                node_id,
                plugin: ThreatAssessmentPlugin::new(pipeline.clone()),
                pipeline,
            }),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }

    /// Video-frame adapter over the same pipeline
    pub fn plugin(&self) -> &ThreatAssessmentPlugin {
        &self.inner.plugin
    }

    pub fn pipeline(&self) -> &SharedPipeline {
        &self.inner.pipeline
    }

    /// Run one frame of pre-tracked observations through the pipeline
    pub async fn process_observations(&self, frame: &FrameObservations) -> Result<FrameOutcome, IngestError> {
        self.inner.pipeline.lock().await.process_frame(frame).await
    }

    pub async fn current_assessment(&self) -> FrameAssessment {
        self.inner.pipeline.lock().await.assess()
    }

    pub async fn latest_report(&self) -> Option<TickReport> {
        self.inner.pipeline.lock().await.last_report().cloned()
    }

    /// Every registered track, in registration order
    pub async fn nodes(&self) -> Vec<Node> {
        let snapshot = self.inner.pipeline.lock().await.snapshot();
        snapshot.nodes().to_vec()
    }

    /// Sink names and frame count, for readiness checks
    pub async fn readiness(&self) -> (Vec<String>, u64) {
        let pipeline = self.inner.pipeline.lock().await;
        (pipeline.sink_names(), pipeline.frame_count())
    }

    /// Drain queued reports to the sinks before the process exits
    pub async fn shutdown(&self) -> Result<()> {
        info!(node_id = %self.inner.node_id, "shutting down threat engine");
        let pipeline = self.inner.pipeline.lock().await;
        let failures = pipeline.flush_reports().await;
        info!(
            frames = pipeline.frame_count(),
            ticks = pipeline.ticks_elapsed(),
            sink_failures = failures.len(),
            "threat engine shutdown complete"
        );
        Ok(())
    }
}
