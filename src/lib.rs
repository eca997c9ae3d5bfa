//! Crowd threat assessment: the threat engine that clusters tracked people and
//! scores each cluster, and the alert service that serves the resulting
//! incidents to operators.

pub use alert_service;
pub use common;
pub use threat_engine;
