// Library interface for TrackRS modules
// This allows integration tests and the CLI to drive the session engine

pub mod alerts;
pub mod config;
pub mod error;
pub mod geo;
pub mod goals;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod record;
pub mod replay;
pub mod session;
pub mod splits;
pub mod storage;
pub mod sync;
pub mod units;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::AppConfig;
pub use error::{Result, TrackRsError};
pub use geo::{haversine_distance, FilterOutcome, GeoFilter};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use record::{SessionRecord, TrackPoint};
pub use session::{EngineConfig, SensorEvent, SessionController, SessionOutput, StepBaselineMode};
pub use storage::{RecordSink, RunStore};
pub use sync::{SyncDocument, SyncService};
