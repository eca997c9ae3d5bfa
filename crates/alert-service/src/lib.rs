pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod reader;
pub mod routes;
pub mod timeline;
pub mod types;

// Re-export commonly used types
pub use catalog::GestureCatalog;
pub use config::AlertServiceConfig;
pub use dispatch::AlertDispatcher;
pub use reader::{parse_alerts, read_alerts, ReaderError};
pub use routes::{create_router, AppState};
pub use timeline::{AlertTimeline, SimulationClock};
pub use types::*;
