use serde::{Deserialize, Serialize};

/// m/s → km/h
pub const MS_TO_KMH: f64 = 3.6;

/// Raw fix as delivered by a position source (speed still in m/s)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub lat: f64,
    pub lng: f64,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Meters per second, `None` when the receiver does not report speed
    pub speed: Option<f64>,
}

impl RawFix {
    pub fn new(lat: f64, lng: f64, timestamp: i64, speed: Option<f64>) -> Self {
        Self {
            lat,
            lng,
            timestamp,
            speed,
        }
    }

    /// Speed in km/h, absent speed reads as 0
    pub fn speed_kmh(&self) -> f64 {
        self.speed.map(|s| s * MS_TO_KMH).unwrap_or(0.0)
    }
}

/// Accepted trajectory point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    pub lat: f64,
    pub lng: f64,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// km/h
    pub speed: Option<f64>,
}

impl LocationPoint {
    pub fn new(lat: f64, lng: f64, timestamp: i64, speed: Option<f64>) -> Self {
        Self {
            lat,
            lng,
            timestamp,
            speed,
        }
    }

    /// Speed with `None` read as 0
    pub fn speed_or_zero(&self) -> f64 {
        self.speed.unwrap_or(0.0)
    }
}

impl From<&RawFix> for LocationPoint {
    fn from(fix: &RawFix) -> Self {
        LocationPoint {
            lat: fix.lat,
            lng: fix.lng,
            timestamp: fix.timestamp,
            speed: Some(fix.speed_kmh()),
        }
    }
}

/// Trip metrics derived from a trajectory
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStats {
    /// km
    pub distance: f64,
    /// km/h
    pub avg_speed: f64,
    /// km/h
    pub max_speed: f64,
    /// m²
    pub area: f64,
}

/// Tracking status state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingStatus {
    /// Not subscribed to the position source
    #[default]
    Idle,
    /// Subscribed and accepting samples
    Tracking,
    /// Reserved, never entered
    Paused,
    /// Position source failed
    Error,
    /// Location permission refused
    PermissionDenied,
}

impl TrackingStatus {
    /// Status from which `start()` clears the previous trajectory
    pub fn resets_on_start(&self) -> bool {
        matches!(self, TrackingStatus::Idle | TrackingStatus::PermissionDenied)
    }
}

/// Completed, named session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSession {
    pub name: String,
    /// Epoch milliseconds of the first point
    pub start_time: i64,
    /// Epoch milliseconds of the last point
    pub end_time: i64,
    pub location_history: Vec<LocationPoint>,
    pub stats: TrackingStats,
}

impl TrackingSession {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).max(0)
    }
}

/// In-progress session autosave slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSession {
    pub location_history: Vec<LocationPoint>,
    pub stats: TrackingStats,
}

/// Session as held by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: u64,
    #[serde(flatten)]
    pub session: TrackingSession,
}
