use common::TrackId;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the node registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Attributes were assigned before the track was upserted
    #[error("track '{0}' is not registered")]
    NotFound(TrackId),
}

/// Errors raised while folding collaborator output into the registry
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("detector failed: {0}")]
    Detector(#[source] BoxError),

    #[error("tracker failed: {0}")]
    Tracker(#[source] BoxError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised by a report sink; never fatal to the frame loop
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint rejected record with status {0}")]
    Rejected(u16),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Invalid engine configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
