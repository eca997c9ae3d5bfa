//! Background delivery of tick reports.
//!
//! The frame loop hands finished reports to a bounded queue and moves on; a
//! spawned task owns the [`SinkSet`] and writes each report in order. Failed
//! writes and reports dropped on a full queue are collected for the caller to
//! pick up with [`ReportPublisher::take_failures`] or [`ReportPublisher::flush`].

use super::{RecordKind, SinkFailure, SinkSet};
use crate::scheduler::TickReport;
use std::sync::{Arc, Mutex};
use telemetry::metrics::THREAT_ENGINE_SINK_FAILURES;
use tokio::sync::{mpsc, oneshot};

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Name reported for reports the queue refused
pub const QUEUE_SINK_NAME: &str = "queue";

enum Command {
    Publish(TickReport),
    Flush(oneshot::Sender<()>),
}

type FailureLog = Arc<Mutex<Vec<SinkFailure>>>;

pub struct ReportPublisher {
    sinks: SinkSet,
    capacity: usize,
    tx: Option<mpsc::Sender<Command>>,
    failures: FailureLog,
}

impl ReportPublisher {
    pub fn new(sinks: SinkSet) -> Self {
        Self::with_capacity(sinks, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(sinks: SinkSet, capacity: usize) -> Self {
        Self {
            sinks,
            capacity: capacity.max(1),
            tx: None,
            failures: Arc::default(),
        }
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.names()
    }

    /// Queue a report without waiting on any sink.
    ///
    /// The writer task starts on the first report. A full queue drops the
    /// report and records one failure for it; nothing is retried.
    pub fn submit(&mut self, report: TickReport) {
        if self.sinks.is_empty() {
            return;
        }

        let tick = report.tick;
        let sent = self.sender().try_send(Command::Publish(report));
        if let Err(e) = sent {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "report queue full",
                mpsc::error::TrySendError::Closed(_) => "report writer stopped",
            };
            tracing::warn!(tick, capacity = self.capacity, reason, "tick report dropped");
            THREAT_ENGINE_SINK_FAILURES
                .with_label_values(&[QUEUE_SINK_NAME, RecordKind::Report.as_str()])
                .inc();
            record_failures(
                &self.failures,
                vec![SinkFailure {
                    sink: QUEUE_SINK_NAME.to_string(),
                    record: RecordKind::Report,
                    error: reason.to_string(),
                }],
            );
        }
    }

    /// Failures collected since the last call
    pub fn take_failures(&self) -> Vec<SinkFailure> {
        match self.failures.lock() {
            Ok(mut failures) => std::mem::take(&mut *failures),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Wait until every queued report has been written, then return the
    /// failures collected so far.
    pub async fn flush(&self) -> Vec<SinkFailure> {
        if let Some(tx) = &self.tx {
            let (ack, done) = oneshot::channel();
            if tx.send(Command::Flush(ack)).await.is_ok() {
                let _ = done.await;
            }
        }
        self.take_failures()
    }

    fn sender(&mut self) -> &mpsc::Sender<Command> {
        let (sinks, capacity, failures) = (&self.sinks, self.capacity, &self.failures);
        self.tx.get_or_insert_with(|| {
            let (tx, rx) = mpsc::channel(capacity);
            tokio::spawn(run_writer(sinks.clone(), rx, failures.clone()));
            tracing::debug!(sinks = ?sinks.names(), capacity, "report writer started");
            tx
        })
    }
}

impl std::fmt::Debug for ReportPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportPublisher")
            .field("sinks", &self.sinks)
            .field("capacity", &self.capacity)
            .field("running", &self.tx.is_some())
            .finish()
    }
}

async fn run_writer(sinks: SinkSet, mut rx: mpsc::Receiver<Command>, failures: FailureLog) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Publish(report) => {
                let failed = sinks.publish(&report).await;
                if !failed.is_empty() {
                    record_failures(&failures, failed);
                }
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("report writer stopped");
}

fn record_failures(log: &FailureLog, failed: Vec<SinkFailure>) {
    match log.lock() {
        Ok(mut failures) => failures.extend(failed),
        Err(poisoned) => poisoned.into_inner().extend(failed),
    }
}
