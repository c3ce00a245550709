use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::TrackResult;
use crate::types::RawFix;

/// Minimum spacing between accepted samples (ms)
pub const DEFAULT_THROTTLE_INTERVAL_MS: i64 = 3000;

/// Samples slower than this are dropped once the trajectory has a point (km/h)
pub const DEFAULT_MIN_SPEED_KMH: f64 = 1.0;

/// Clock the throttle reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasis {
    /// Wall clock at the moment the fix is handled
    #[default]
    Received,
    /// The fix's own timestamp (log replay, deterministic runs)
    Fix,
}

impl TimeBasis {
    /// Current time in epoch milliseconds for this fix
    pub fn now_ms(&self, fix: &RawFix) -> i64 {
        match self {
            TimeBasis::Received => Utc::now().timestamp_millis(),
            TimeBasis::Fix => fix.timestamp,
        }
    }
}

/// Ingestion policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Throttle window (ms)
    pub throttle_interval_ms: i64,
    /// Stillness threshold (km/h)
    pub min_speed_kmh: f64,
    pub time_basis: TimeBasis,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            throttle_interval_ms: DEFAULT_THROTTLE_INTERVAL_MS,
            min_speed_kmh: DEFAULT_MIN_SPEED_KMH,
            time_basis: TimeBasis::Received,
        }
    }
}

impl TrackerConfig {
    /// Config that throttles on fix timestamps
    pub fn replay() -> Self {
        Self {
            time_basis: TimeBasis::Fix,
            ..Self::default()
        }
    }

    /// Load from a JSON file, missing fields fall back to defaults
    pub fn from_file(path: &Path) -> TrackResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.throttle_interval_ms, 3000);
        assert_eq!(config.min_speed_kmh, 1.0);
        assert_eq!(config.time_basis, TimeBasis::Received);
        assert_eq!(TrackerConfig::replay().time_basis, TimeBasis::Fix);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackerConfig = serde_json::from_str(r#"{"time_basis": "fix"}"#).unwrap();
        assert_eq!(config.time_basis, TimeBasis::Fix);
        assert_eq!(config.throttle_interval_ms, DEFAULT_THROTTLE_INTERVAL_MS);
    }

    #[test]
    fn test_fix_time_basis_reads_fix_timestamp() {
        let fix = RawFix::new(0.0, 0.0, 42_000, None);
        assert_eq!(TimeBasis::Fix.now_ms(&fix), 42_000);
        assert!(TimeBasis::Received.now_ms(&fix) > 1_600_000_000_000);
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join("gps_tracker_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tracker.json");
        std::fs::write(&path, r#"{"throttle_interval_ms": 5000, "min_speed_kmh": 2.5}"#).unwrap();

        let config = TrackerConfig::from_file(&path).unwrap();
        assert_eq!(config.throttle_interval_ms, 5000);
        assert_eq!(config.min_speed_kmh, 2.5);

        assert!(TrackerConfig::from_file(&dir.join("missing.json")).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
