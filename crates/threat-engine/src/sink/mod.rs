//! Destinations for tick reports.
//!
//! A sink failure never stops the frame loop: [`SinkSet::publish`] attempts
//! every record on every sink and hands back what failed, and the pipeline
//! runs it off the frame path through a [`ReportPublisher`].

pub mod csv_log;
pub mod memory;
pub mod publisher;
pub mod webhook;

pub use csv_log::CsvLogSink;
pub use memory::MemorySink;
pub use publisher::ReportPublisher;
pub use webhook::WebhookSink;

use crate::config::ThreatEngineConfig;
use crate::error::SinkError;
use crate::scheduler::TickReport;
use async_trait::async_trait;
use common::{ClusterRecord, IncidentRecord};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use telemetry::metrics::THREAT_ENGINE_SINK_FAILURES;

/// Append-only destination for the two report record shapes
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Short name used in logs and metric labels
    fn name(&self) -> &str;

    async fn write_cluster(&self, record: &ClusterRecord) -> Result<(), SinkError>;

    async fn write_incident(&self, record: &IncidentRecord) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Cluster,
    Incident,
    /// A whole report that never reached the sinks
    Report,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Cluster => "cluster",
            RecordKind::Incident => "incident",
            RecordKind::Report => "report",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record that a sink failed to accept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkFailure {
    pub sink: String,
    pub record: RecordKind,
    pub error: String,
}

/// Fan-out over every configured sink
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSV logs, plus the webhook when an endpoint is configured
    pub fn from_config(config: &ThreatEngineConfig) -> Result<Self, SinkError> {
        let mut sinks = Self::new().with(Arc::new(CsvLogSink::open(
            &config.cluster_log_path,
            &config.incident_log_path,
        )?));

        if let Some(url) = &config.incident_webhook_url {
            tracing::info!(url = %url, "forwarding incidents to webhook");
            sinks.push(Arc::new(WebhookSink::new(url.clone())?));
        }

        Ok(sinks)
    }

    pub fn with(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Write a report to every sink, cluster records first. Not retried.
    pub async fn publish(&self, report: &TickReport) -> Vec<SinkFailure> {
        let mut failures = Vec::new();

        for sink in &self.sinks {
            for record in &report.clusters {
                if let Err(e) = sink.write_cluster(record).await {
                    failures.push(failure(sink.name(), RecordKind::Cluster, &e, report.tick));
                }
            }
            for record in &report.incidents {
                if let Err(e) = sink.write_incident(record).await {
                    failures.push(failure(sink.name(), RecordKind::Incident, &e, report.tick));
                }
            }
        }

        failures
    }
}

impl fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSet").field("sinks", &self.names()).finish()
    }
}

fn failure(sink: &str, record: RecordKind, error: &SinkError, tick: u64) -> SinkFailure {
    tracing::warn!(sink, record = %record, tick, error = %error, "sink write failed");
    THREAT_ENGINE_SINK_FAILURES
        .with_label_values(&[sink, record.as_str()])
        .inc();

    SinkFailure {
        sink: sink.to_string(),
        record,
        error: error.to_string(),
    }
}
