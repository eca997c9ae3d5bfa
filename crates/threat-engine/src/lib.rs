//! Situational threat assessment over tracked people in a video stream.
//!
//! Each frame's tracks are folded into a [`nodes::NodeRegistry`]; the
//! registry snapshot is turned into a proximity graph, split into clusters
//! and scored. Every `frames_per_tick` frames a [`scheduler::TickReport`] is
//! queued for the configured sinks.

pub mod aggregator;
pub mod api;
pub mod cluster;
pub mod config;
pub mod error;
pub mod ingest;
pub mod nodes;
pub mod pipeline;
pub mod plugin;
pub mod policy;
pub mod proximity;
pub mod replay;
pub mod scheduler;
pub mod sink;
pub mod state;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use config::{IncidentMode, ThreatEngineConfig};
pub use pipeline::{FrameAssessment, FrameOutcome, ThreatPipeline};
pub use plugin::ThreatAssessmentPlugin;
pub use state::ThreatEngineState;

/// Pipeline shared between the HTTP API and the plugin wrapper
pub type SharedPipeline = Arc<Mutex<ThreatPipeline>>;
