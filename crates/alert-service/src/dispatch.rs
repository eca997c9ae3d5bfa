use crate::catalog::GestureCatalog;
use crate::types::{AlertDto, AlertRecord, TIME_FORMAT};
use telemetry::metrics::{ALERT_SERVICE_ALERTS_DISPATCHED, ALERT_SERVICE_ALERTS_SKIPPED};
use tracing::warn;

/// Converts timeline records into operator-facing alerts
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    catalog: GestureCatalog,
}

impl AlertDispatcher {
    pub fn new(catalog: GestureCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.catalog
    }

    pub fn to_dto(&self, record: &AlertRecord) -> Option<AlertDto> {
        let metadata = self.catalog.get(&record.gesture)?;
        Some(AlertDto {
            camera_id: record.camera_id.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            severity: metadata.severity(),
            time: record.timestamp.format(TIME_FORMAT).to_string(),
            description: metadata.description.clone(),
        })
    }

    /// Records whose gesture has no catalog entry are skipped
    pub fn to_dtos(&self, records: &[AlertRecord]) -> Vec<AlertDto> {
        let mut dtos = Vec::with_capacity(records.len());
        for record in records {
            match self.to_dto(record) {
                Some(dto) => dtos.push(dto),
                None => {
                    warn!(
                        gesture = %record.gesture,
                        camera_id = %record.camera_id,
                        "no metadata for gesture, skipping alert"
                    );
                    ALERT_SERVICE_ALERTS_SKIPPED
                        .with_label_values(&["missing_metadata"])
                        .inc();
                }
            }
        }
        ALERT_SERVICE_ALERTS_DISPATCHED.inc_by(dtos.len() as u64);
        dtos
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(GestureCatalog::seeded())
    }
}
