use thiserror::Error;

/// Tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location acquisition failed: {0}")]
    Acquisition(String),

    #[error("Not enough tracking data: {points} point(s), at least 2 required")]
    InsufficientData { points: usize },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for tracker operations
pub type TrackResult<T> = Result<T, TrackerError>;

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

/// Fails with `InsufficientData` unless the path can form a session record.
///
/// Save and export both refuse trajectories below two points rather than
/// producing all-zero output.
pub fn require_min_points(points: usize) -> TrackResult<()> {
    if points < 2 {
        return Err(TrackerError::InsufficientData { points });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_points_guard() {
        assert_eq!(
            require_min_points(0),
            Err(TrackerError::InsufficientData { points: 0 })
        );
        assert_eq!(
            require_min_points(1),
            Err(TrackerError::InsufficientData { points: 1 })
        );
        assert!(require_min_points(2).is_ok());
    }

    #[test]
    fn test_error_messages() {
        let err = TrackerError::InsufficientData { points: 1 };
        assert!(err.to_string().contains("at least 2"));

        let err = TrackerError::Acquisition("timeout".to_string());
        assert_eq!(err.to_string(), "Location acquisition failed: timeout");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(TrackerError::from(io), TrackerError::Storage(_)));
    }
}
