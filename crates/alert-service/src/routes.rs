use crate::dispatch::AlertDispatcher;
use crate::timeline::AlertTimeline;
use crate::types::{AlertDto, AlertRecord};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use common::IncidentRecord;
use serde_json::json;
use std::sync::Arc;
use telemetry::metrics::ALERT_SERVICE_INGESTED;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error};

#[derive(Clone)]
pub struct AppState {
    pub timeline: Arc<RwLock<AlertTimeline>>,
    pub dispatcher: Arc<AlertDispatcher>,
}

impl AppState {
    pub fn new(timeline: AlertTimeline, dispatcher: AlertDispatcher) -> Self {
        Self {
            timeline: Arc::new(RwLock::new(timeline)),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Alerts in the live window, scored and described
    pub async fn live_alerts(&self) -> Vec<AlertDto> {
        let records = self.timeline.write().await.live();
        self.dispatcher.to_dtos(&records)
    }

    pub async fn ingest(&self, incident: &IncidentRecord) -> AlertRecord {
        let record = AlertRecord::from(incident);
        self.timeline.write().await.insert(record.clone());
        ALERT_SERVICE_INGESTED.inc();
        record
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        // Alerts
        .route("/api/alerts", post(ingest_alert))
        .route("/api/alerts/live", get(live_alerts))
        .route("/api/gestures", get(list_gestures))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let alerts = state.timeline.read().await.len();
    Json(json!({
        "status": "healthy",
        "service": "alert-service",
        "alerts": alerts
    }))
}

async fn metrics() -> impl IntoResponse {
    match telemetry::metrics::encode_metrics() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to encode metrics"})),
            )
                .into_response()
        }
    }
}

async fn live_alerts(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.live_alerts().await))
}

async fn ingest_alert(
    State(state): State<AppState>,
    Json(incident): Json<IncidentRecord>,
) -> impl IntoResponse {
    let record = state.ingest(&incident).await;
    debug!(
        camera_id = %record.camera_id,
        gesture = %record.gesture,
        time = %record.timestamp,
        "incident ingested"
    );
    (StatusCode::ACCEPTED, Json(record))
}

async fn list_gestures(State(state): State<AppState>) -> impl IntoResponse {
    let gestures = state.dispatcher.catalog().by_severity();
    let entries: Vec<_> = gestures
        .iter()
        .map(|m| {
            json!({
                "gesture": m.gesture,
                "description": m.description,
                "aggression": m.aggression,
                "proximity": m.proximity,
                "movement": m.movement,
                "severity": m.severity(),
            })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "gestures": entries })))
}
