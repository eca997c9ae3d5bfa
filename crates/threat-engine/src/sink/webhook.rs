use super::ReportSink;
use crate::error::SinkError;
use async_trait::async_trait;
use common::{ClusterRecord, IncidentRecord};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts incident records as JSON to an HTTP endpoint, typically the alert service.
///
/// Cluster records are not forwarded.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, SinkError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReportSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn write_cluster(&self, _record: &ClusterRecord) -> Result<(), SinkError> {
        Ok(())
    }

    async fn write_incident(&self, record: &IncidentRecord) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(record).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected(status.as_u16()));
        }

        tracing::debug!(url = %self.url, gesture = %record.gesture, "incident forwarded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{GeoLocation, Gesture};

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // nothing listens on port 9 of the loopback interface
        let sink = WebhookSink::with_timeout("http://127.0.0.1:9/api/alerts", Duration::from_secs(2))
            .unwrap();
        let record = IncidentRecord {
            timestamp: Utc::now(),
            camera_id: "CAM_02".to_string(),
            location: GeoLocation::new(0.0, 0.0),
            gesture: Gesture::Walking,
        };

        assert!(matches!(
            sink.write_incident(&record).await,
            Err(SinkError::Http(_))
        ));
    }
}
