pub mod observations;
pub mod records;
pub mod vision;

pub use observations::{FrameObservations, Gender, Gesture, ThreatLevel, TrackId, TrackObservation};
pub use records::{ClusterRecord, GeoLocation, IncidentRecord};
pub use vision::{BoundingBox, PixelRect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
