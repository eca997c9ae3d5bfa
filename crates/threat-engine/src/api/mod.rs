pub mod error;
pub mod routes;

pub use error::ApiError;

use crate::state::ThreatEngineState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn router(state: ThreatEngineState) -> Router {
    Router::new()
        // Health and metrics endpoints
        .route("/healthz", get(routes::healthz))
        .route("/readyz", get(routes::readyz))
        .route("/metrics", get(routes::metrics))
        // Plugin endpoints
        .route("/v1/plugins", get(routes::list_plugins))
        .route("/v1/plugins/:id", get(routes::get_plugin))
        .route("/v1/plugins/:id/config", put(routes::configure_plugin))
        .route("/v1/plugins/:id/frames", post(routes::submit_plugin_frame))
        // Assessment endpoints
        .route("/v1/frames", post(routes::submit_frame))
        .route("/v1/clusters", get(routes::list_clusters))
        .route("/v1/reports/latest", get(routes::latest_report))
        .route("/v1/nodes", get(routes::list_nodes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
