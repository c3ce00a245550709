use crate::geodesy;
use crate::types::{LocationPoint, TrackingStats};

/// Speeds at or below this are left out of the average (km/h)
pub const AVG_SPEED_FLOOR_KMH: f64 = 1.0;

/// Derive trip metrics from the whole trajectory
///
/// Recomputed from scratch on every call. Paths shorter than 2 points give
/// all-zero stats.
pub fn compute_stats(path: &[LocationPoint]) -> TrackingStats {
    if path.len() < 2 {
        return TrackingStats::default();
    }

    let moving: Vec<f64> = path
        .iter()
        .map(LocationPoint::speed_or_zero)
        .filter(|s| *s > AVG_SPEED_FLOOR_KMH)
        .collect();

    let avg_speed = if moving.is_empty() {
        0.0
    } else {
        moving.iter().sum::<f64>() / moving.len() as f64
    };

    let max_speed = path
        .iter()
        .map(LocationPoint::speed_or_zero)
        .fold(0.0_f64, f64::max);

    TrackingStats {
        distance: geodesy::total_distance(path),
        avg_speed,
        max_speed,
        area: geodesy::area(path),
    }
}
