use chrono::Utc;
use tokio::sync::mpsc::Receiver;

use crate::config::TrackerConfig;
use crate::error::{require_min_points, TrackResult, TrackerError};
use crate::export::local_datetime;
use crate::ingest::{SampleDecision, SampleFilter, ThrottleState};
use crate::source::{PermissionState, PositionEvent, PositionSource, SourceError};
use crate::stats::compute_stats;
use crate::storage::SessionStore;
use crate::types::{LocationPoint, TrackingSession, TrackingStats, TrackingStatus};

const PERMISSION_NOTICE: &str =
    "GPS permission has been denied. Please enable location access in your settings.";
const UNAVAILABLE_NOTICE: &str = "Geolocation is not supported on this device.";

/// Session lifecycle controller
///
/// Owns the trajectory, its stats, the throttle state and the subscription to
/// the position source. Events are handled one at a time, to completion, in
/// arrival order.
pub struct Tracker {
    config: TrackerConfig,
    filter: SampleFilter,
    throttle: ThrottleState,
    status: TrackingStatus,
    location_history: Vec<LocationPoint>,
    stats: TrackingStats,
    notice: Option<String>,
    source: Box<dyn PositionSource>,
    store: Box<dyn SessionStore>,
    subscription: Option<Receiver<PositionEvent>>,
}

impl Tracker {
    /// Create new tracker in Idle state
    pub fn new(
        source: Box<dyn PositionSource>,
        store: Box<dyn SessionStore>,
        config: TrackerConfig,
    ) -> Self {
        Tracker {
            filter: SampleFilter::from_config(&config),
            config,
            throttle: ThrottleState::default(),
            status: TrackingStatus::Idle,
            location_history: Vec::new(),
            stats: TrackingStats::default(),
            notice: None,
            source,
            store,
            subscription: None,
        }
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn is_tracking(&self) -> bool {
        self.status == TrackingStatus::Tracking
    }

    pub fn location_history(&self) -> &[LocationPoint] {
        &self.location_history
    }

    pub fn stats(&self) -> TrackingStats {
        self.stats
    }

    /// Last user-facing notice (permission or acquisition failure)
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    fn set_status(&mut self, status: TrackingStatus) {
        if self.status != status {
            log::info!("Tracking status {:?} -> {:?}", self.status, status);
            self.status = status;
        }
    }

    fn unsubscribe(&mut self) {
        // Dropping the receiver discards anything still queued
        self.subscription = None;
        self.source.unwatch();
    }

    /// Begin tracking (Idle/PermissionDenied/Error → Tracking)
    ///
    /// Starting from Idle or PermissionDenied clears the previous trajectory.
    /// Starting while already tracking keeps it and re-subscribes.
    pub fn start(&mut self) -> TrackResult<()> {
        // A failed restart must not leave an earlier subscription running
        if !self.source.is_available() {
            self.unsubscribe();
            self.set_status(TrackingStatus::Error);
            self.notice = Some(UNAVAILABLE_NOTICE.to_string());
            log::warn!("{}", UNAVAILABLE_NOTICE);
            return Err(TrackerError::Acquisition(UNAVAILABLE_NOTICE.to_string()));
        }

        if self.source.permission() == PermissionState::Denied {
            self.unsubscribe();
            self.set_status(TrackingStatus::PermissionDenied);
            self.notice = Some(PERMISSION_NOTICE.to_string());
            log::warn!("Location permission denied, not subscribing");
            return Err(TrackerError::PermissionDenied);
        }

        if self.status.resets_on_start() {
            self.reset();
        }

        if self.subscription.is_some() {
            self.unsubscribe();
        }

        self.notice = None;
        self.set_status(TrackingStatus::Tracking);

        match self.source.watch() {
            Ok(rx) => {
                self.subscription = Some(rx);
                Ok(())
            }
            Err(err) => {
                let tracker_err = match &err {
                    SourceError::PermissionDenied => TrackerError::PermissionDenied,
                    other => TrackerError::Acquisition(other.to_string()),
                };
                self.handle_source_error(err);
                Err(tracker_err)
            }
        }
    }

    /// Stop tracking (any state → Idle). Idempotent.
    ///
    /// Nothing delivered after this returns is ingested.
    pub fn stop(&mut self) {
        self.unsubscribe();
        self.set_status(TrackingStatus::Idle);
    }

    /// Clear trajectory, stats and the autosave slot, independent of status
    pub fn reset(&mut self) {
        self.location_history.clear();
        self.stats = TrackingStats::default();
        self.throttle.clear();
        if let Err(e) = self.store.clear_current() {
            log::warn!("Failed to clear autosave: {}", e);
        }
    }

    /// Dispatch one event from the source
    ///
    /// Returns the ingestion decision for fixes; `None` for failures and for
    /// anything arriving while not tracking.
    pub fn handle_event(&mut self, event: PositionEvent) -> Option<SampleDecision> {
        if self.status != TrackingStatus::Tracking {
            log::trace!("Ignoring {:?} while {:?}", event, self.status);
            return None;
        }

        match event {
            PositionEvent::Fix(fix) => {
                let now = self.config.time_basis.now_ms(&fix);
                let decision =
                    self.filter
                        .evaluate(&mut self.throttle, &fix, now, self.location_history.len());

                match decision {
                    SampleDecision::Accepted(point) => self.append(point),
                    SampleDecision::Throttled => log::trace!("Throttled fix at {}", fix.timestamp),
                    SampleDecision::Stationary => {
                        log::trace!("Stationary fix at {}", fix.timestamp)
                    }
                }
                Some(decision)
            }
            PositionEvent::Failed(err) => {
                self.handle_source_error(err);
                None
            }
        }
    }

    fn append(&mut self, point: LocationPoint) {
        self.location_history.push(point);
        self.stats = compute_stats(&self.location_history);
        log::debug!(
            "Accepted point #{} ({:.6}, {:.6}) distance {:.3} km",
            self.location_history.len(),
            point.lat,
            point.lng,
            self.stats.distance
        );

        // Autosave must never interrupt tracking
        if let Err(e) = self.store.put_current(&self.location_history, &self.stats) {
            log::warn!("Autosave failed: {}", e);
        }
    }

    fn handle_source_error(&mut self, err: SourceError) {
        self.unsubscribe();
        match err {
            SourceError::PermissionDenied => {
                self.set_status(TrackingStatus::PermissionDenied);
                self.notice = Some(PERMISSION_NOTICE.to_string());
            }
            other => {
                self.set_status(TrackingStatus::Error);
                self.notice = Some(format!("Error getting location: {}", other));
            }
        }
        log::warn!("GPS error: {}", self.notice.as_deref().unwrap_or_default());
    }

    /// Handle every event already delivered, without waiting
    ///
    /// Returns the number of accepted samples.
    pub fn process_pending(&mut self) -> usize {
        let mut accepted = 0;
        loop {
            let Some(rx) = self.subscription.as_mut() else {
                break;
            };
            let Ok(event) = rx.try_recv() else {
                break;
            };
            if self.handle_event(event).is_some_and(|d| d.is_accepted()) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Wait for the next event, `None` once unsubscribed or the source closed
    pub async fn next_event(&mut self) -> Option<PositionEvent> {
        self.subscription.as_mut()?.recv().await
    }

    /// Handle events until the stream ends, returns accepted count
    pub async fn run(&mut self) -> usize {
        let mut accepted = 0;
        while let Some(event) = self.next_event().await {
            if self.handle_event(event).is_some_and(|d| d.is_accepted()) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Package the current trajectory as a named session, no side effects
    pub fn snapshot_session(&self, name: &str) -> TrackResult<TrackingSession> {
        require_min_points(self.location_history.len())?;

        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::InvalidParameters(
                "session name must not be empty".to_string(),
            ));
        }

        let (first, last) = match (self.location_history.first(), self.location_history.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(TrackerError::InsufficientData {
                    points: self.location_history.len(),
                })
            }
        };

        Ok(TrackingSession {
            name: name.to_string(),
            start_time: first.timestamp,
            end_time: last.timestamp,
            location_history: self.location_history.clone(),
            stats: self.stats,
        })
    }

    /// Store the current trajectory as a completed session and reset
    pub fn save_session(&mut self, name: &str) -> TrackResult<u64> {
        let session = self.snapshot_session(name)?;
        let points = session.location_history.len();
        let id = self.store.add_session(session)?;
        log::info!("Saved session {} with {} points", id, points);
        self.reset();
        Ok(id)
    }

    /// Reload the autosave slot after a restart of the host app
    ///
    /// Only applies while idle with an empty trajectory. Stats are recomputed
    /// rather than trusted. Returns whether anything was restored.
    pub fn restore_current(&mut self) -> TrackResult<bool> {
        if self.status != TrackingStatus::Idle || !self.location_history.is_empty() {
            return Ok(false);
        }

        match self.store.load_current()? {
            Some(current) if !current.location_history.is_empty() => {
                self.location_history = current.location_history;
                self.stats = compute_stats(&self.location_history);
                log::info!(
                    "Restored {} autosaved points",
                    self.location_history.len()
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.source.unwatch();
    }
}

/// Fallback name offered when saving a session
pub fn default_session_name(now_ms: i64) -> String {
    format!("Session - {}", local_datetime(now_ms))
}

/// Default name stamped with the current time
pub fn default_session_name_now() -> String {
    default_session_name(Utc::now().timestamp_millis())
}
