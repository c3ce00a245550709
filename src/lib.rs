// GPS trip tracker
// Throttled ingestion of position fixes into a trajectory, plus distance,
// speed and enclosed-area stats derived from it

pub mod config;
pub mod error;
pub mod export;
pub mod geodesy;
pub mod ingest;
pub mod source;
pub mod stats;
pub mod storage;
pub mod tracker;
pub mod types;

pub use config::{TimeBasis, TrackerConfig};
pub use error::{TrackResult, TrackerError};
pub use ingest::{SampleDecision, SampleFilter, ThrottleState};
pub use source::{
    ChannelSource, PermissionState, PositionEvent, PositionFeed, PositionSource, ReplaySource,
    SourceError,
};
pub use stats::compute_stats;
pub use storage::{JsonFileStore, MemoryStore, SessionStore};
pub use tracker::Tracker;
pub use types::{
    CurrentSession, LocationPoint, RawFix, StoredSession, TrackingSession, TrackingStats,
    TrackingStatus,
};
