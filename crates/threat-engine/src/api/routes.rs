use super::error::ApiError;
use crate::plugin::PLUGIN_ID;
use crate::state::ThreatEngineState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::vision::{PluginListResponse, VideoFrame};
use common::FrameObservations;
use serde_json::{json, Value};

/// Health check endpoint
pub async fn healthz(State(state): State<ThreatEngineState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "threat-engine",
            "node_id": state.node_id(),
        })),
    )
}

/// Ready once the pipeline lock can be taken
pub async fn readyz(State(state): State<ThreatEngineState>) -> impl IntoResponse {
    let (sinks, frames) = state.readiness().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "sinks": sinks,
            "frames": frames,
        })),
    )
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics() -> impl IntoResponse {
    match telemetry::metrics::encode_metrics() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            ApiError::internal("failed to encode metrics").into_response()
        }
    }
}

pub async fn list_plugins(State(state): State<ThreatEngineState>) -> impl IntoResponse {
    let plugins = vec![state.plugin().info()];
    (StatusCode::OK, Json(PluginListResponse { plugins }))
}

fn require_plugin(plugin_id: &str) -> Result<(), ApiError> {
    if plugin_id == PLUGIN_ID {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("Plugin not found: {}", plugin_id)))
    }
}

pub async fn get_plugin(
    State(state): State<ThreatEngineState>,
    Path(plugin_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_plugin(&plugin_id)?;
    Ok((StatusCode::OK, Json(state.plugin().info())))
}

/// Merge a partial config onto the running one
pub async fn configure_plugin(
    State(state): State<ThreatEngineState>,
    Path(plugin_id): Path<String>,
    Json(overrides): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    require_plugin(&plugin_id)?;
    let config = state.plugin().configure(overrides).await.map_err(|e| {
        tracing::warn!(error = %e, "config rejected");
        ApiError::bad_request(format!("Invalid config: {:#}", e))
    })?;
    Ok((StatusCode::OK, Json(config)))
}

/// Run a video frame through the threat assessment adapter
pub async fn submit_plugin_frame(
    State(state): State<ThreatEngineState>,
    Path(plugin_id): Path<String>,
    Json(frame): Json<VideoFrame>,
) -> Result<impl IntoResponse, ApiError> {
    require_plugin(&plugin_id)?;

    let result = state.plugin().process_frame(&frame).await.map_err(|e| {
        tracing::warn!(source_id = %frame.source_id, error = %e, "frame rejected");
        ApiError::bad_request(format!("Failed to process frame: {:#}", e))
    })?;

    Ok((StatusCode::OK, Json(result)))
}

/// Ingest one frame of tracked observations and return its assessment
pub async fn submit_frame(
    State(state): State<ThreatEngineState>,
    Json(frame): Json<FrameObservations>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.process_observations(&frame).await?;
    Ok((StatusCode::OK, Json(outcome)))
}

/// Clusters and threat levels for the registry as it stands
pub async fn list_clusters(State(state): State<ThreatEngineState>) -> impl IntoResponse {
    let assessment = state.current_assessment().await;
    (StatusCode::OK, Json(assessment))
}

pub async fn latest_report(
    State(state): State<ThreatEngineState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .latest_report()
        .await
        .ok_or_else(|| ApiError::not_found("no tick has been reported yet"))?;
    Ok((StatusCode::OK, Json(report)))
}

pub async fn list_nodes(State(state): State<ThreatEngineState>) -> impl IntoResponse {
    let nodes = state.nodes().await;
    (StatusCode::OK, Json(json!({ "count": nodes.len(), "nodes": nodes })))
}
