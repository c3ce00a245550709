//! Per-sample acceptance policy.
//!
//! Two filters run in order: a time throttle, then a stillness filter. A fix
//! that survives both becomes a trajectory point. Stillness drops leave no
//! marker, so a stop shows up only as a time gap between neighbouring points.

use crate::config::TrackerConfig;
use crate::types::{LocationPoint, RawFix};

/// Outcome of evaluating one fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleDecision {
    /// Append this point
    Accepted(LocationPoint),
    /// Inside the throttle window of the last accepted sample
    Throttled,
    /// Too slow while the trajectory already has a point
    Stationary,
}

impl SampleDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SampleDecision::Accepted(_))
    }
}

/// Mutable throttle state, owned by the tracker for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleState {
    /// Epoch ms of the last accepted sample, `None` before the first
    pub last_accepted: Option<i64>,
}

impl ThrottleState {
    pub fn clear(&mut self) {
        self.last_accepted = None;
    }
}

/// Throttle + stillness filter
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFilter {
    throttle_interval_ms: i64,
    min_speed_kmh: f64,
}

impl SampleFilter {
    pub fn new(throttle_interval_ms: i64, min_speed_kmh: f64) -> Self {
        Self {
            throttle_interval_ms,
            min_speed_kmh,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.throttle_interval_ms, config.min_speed_kmh)
    }

    /// Decide whether `fix`, handled at `now_ms`, joins a trajectory of
    /// `trajectory_len` points
    ///
    /// Only an accepted fix touches `state`.
    pub fn evaluate(
        &self,
        state: &mut ThrottleState,
        fix: &RawFix,
        now_ms: i64,
        trajectory_len: usize,
    ) -> SampleDecision {
        if let Some(last) = state.last_accepted {
            if now_ms.saturating_sub(last) < self.throttle_interval_ms {
                return SampleDecision::Throttled;
            }
        }

        let point = LocationPoint::from(fix);
        if point.speed_or_zero() < self.min_speed_kmh && trajectory_len > 0 {
            return SampleDecision::Stationary;
        }

        state.last_accepted = Some(now_ms);
        SampleDecision::Accepted(point)
    }
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fix with speed given in km/h for readability
    fn fix_kmh(lng: f64, timestamp: i64, kmh: f64) -> RawFix {
        RawFix::new(0.0, lng, timestamp, Some(kmh / 3.6))
    }

    #[test]
    fn test_first_sample_accepted() {
        let filter = SampleFilter::default();
        let mut state = ThrottleState::default();

        let decision = filter.evaluate(&mut state, &fix_kmh(0.0, 0, 36.0), 0, 0);
        match decision {
            SampleDecision::Accepted(p) => {
                assert_eq!(p.timestamp, 0);
                assert!((p.speed.unwrap() - 36.0).abs() < 1e-9);
            }
            other => panic!("expected accept, got {:?}", other),
        }
        assert_eq!(state.last_accepted, Some(0));
    }

    #[test]
    fn test_burst_within_one_second_accepts_one() {
        let filter = SampleFilter::default();
        let mut state = ThrottleState::default();
        let mut len = 0;

        for i in 0..10 {
            let now = 1_700_000_000_000 + i * 100;
            let decision = filter.evaluate(&mut state, &fix_kmh(0.0, now, 20.0), now, len);
            if decision.is_accepted() {
                len += 1;
            }
        }

        assert_eq!(len, 1);
    }

    #[test]
    fn test_throttle_window_boundary() {
        let filter = SampleFilter::default();
        let mut state = ThrottleState::default();

        assert!(filter.evaluate(&mut state, &fix_kmh(0.0, 0, 20.0), 0, 0).is_accepted());
        assert_eq!(
            filter.evaluate(&mut state, &fix_kmh(0.0, 2999, 20.0), 2999, 1),
            SampleDecision::Throttled
        );
        assert!(filter.evaluate(&mut state, &fix_kmh(0.0, 3000, 20.0), 3000, 1).is_accepted());
        assert_eq!(state.last_accepted, Some(3000));
    }

    #[test]
    fn test_stillness_after_first_point() {
        let filter = SampleFilter::default();
        let mut state = ThrottleState::default();

        // Same slow fix is fine as the very first sample
        let slow = fix_kmh(0.0, 0, 0.5);
        assert!(filter.evaluate(&mut state, &slow, 0, 0).is_accepted());

        let slow_later = fix_kmh(0.0, 10_000, 0.5);
        assert_eq!(
            filter.evaluate(&mut state, &slow_later, 10_000, 1),
            SampleDecision::Stationary
        );
        // Rejection leaves the throttle untouched
        assert_eq!(state.last_accepted, Some(0));
    }

    #[test]
    fn test_missing_speed_counts_as_still() {
        let filter = SampleFilter::default();
        let mut state = ThrottleState::default();
        let fix = RawFix::new(0.0, 0.0, 5_000, None);

        assert_eq!(
            filter.evaluate(&mut state, &fix, 5_000, 3),
            SampleDecision::Stationary
        );
        assert!(filter.evaluate(&mut state, &fix, 5_000, 0).is_accepted());
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let filter = SampleFilter::default();
        let mut state = ThrottleState {
            last_accepted: Some(i64::MAX - 1),
        };

        // Clock went far backwards: still inside the window
        let now = i64::MIN + 5;
        assert_eq!(
            filter.evaluate(&mut state, &fix_kmh(0.0, now, 20.0), now, 1),
            SampleDecision::Throttled
        );

        state.last_accepted = Some(i64::MIN + 5);
        let now = i64::MAX;
        assert!(filter.evaluate(&mut state, &fix_kmh(0.0, now, 20.0), now, 1).is_accepted());
        assert_eq!(state.last_accepted, Some(i64::MAX));
    }

    #[test]
    fn test_clear_reopens_window() {
        let filter = SampleFilter::default();
        let mut state = ThrottleState::default();

        assert!(filter.evaluate(&mut state, &fix_kmh(0.0, 0, 20.0), 0, 0).is_accepted());
        state.clear();
        assert!(filter.evaluate(&mut state, &fix_kmh(0.0, 10, 20.0), 10, 0).is_accepted());
    }
}
