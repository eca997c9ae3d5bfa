use super::ReportSink;
use crate::error::SinkError;
use async_trait::async_trait;
use common::{ClusterRecord, IncidentRecord};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Keeps the most recent records in memory, oldest dropped first
pub struct MemorySink {
    capacity: usize,
    clusters: RwLock<VecDeque<ClusterRecord>>,
    incidents: RwLock<VecDeque<IncidentRecord>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            clusters: RwLock::new(VecDeque::with_capacity(capacity)),
            incidents: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn clusters(&self) -> Vec<ClusterRecord> {
        self.clusters.read().await.iter().cloned().collect()
    }

    pub async fn incidents(&self) -> Vec<IncidentRecord> {
        self.incidents.read().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.clusters.write().await.clear();
        self.incidents.write().await.clear();
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, capacity: usize) {
    if queue.len() == capacity {
        queue.pop_front();
    }
    queue.push_back(item);
}

#[async_trait]
impl ReportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write_cluster(&self, record: &ClusterRecord) -> Result<(), SinkError> {
        let mut clusters = self.clusters.write().await;
        push_bounded(&mut clusters, record.clone(), self.capacity);
        Ok(())
    }

    async fn write_incident(&self, record: &IncidentRecord) -> Result<(), SinkError> {
        let mut incidents = self.incidents.write().await;
        push_bounded(&mut incidents, record.clone(), self.capacity);
        Ok(())
    }
}
