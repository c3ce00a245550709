//! Position sources.
//!
//! A source hands the tracker a channel of [`PositionEvent`]s on `watch()` and
//! stops feeding it on `unwatch()`. Two implementations live here:
//! [`ChannelSource`], a bridge for platform callbacks (JNI, FFI, tests) that
//! push fixes through a [`PositionFeed`], and [`ReplaySource`], which streams
//! a recorded fix log from a tokio task.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::error::TrackResult;
use crate::types::RawFix;

/// Events per subscription before a pushing callback starts dropping fixes
pub const FEED_CAPACITY: usize = 100;

/// Failure reported by the position source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out waiting for a position fix")]
    Timeout,
}

/// Location permission as reported before subscribing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    /// Not decided yet, the platform will ask on subscribe
    Prompt,
    Denied,
}

/// One delivery from the source
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Fix(RawFix),
    Failed(SourceError),
}

/// Subscription-style supplier of position fixes
pub trait PositionSource: Send {
    /// Whether the device exposes location at all
    fn is_available(&self) -> bool;

    fn permission(&self) -> PermissionState;

    /// Start delivering events on a fresh channel
    fn watch(&mut self) -> Result<Receiver<PositionEvent>, SourceError>;

    /// Stop delivering. Idempotent.
    fn unwatch(&mut self);
}

#[derive(Debug)]
struct FeedState {
    available: bool,
    permission: PermissionState,
    tx: Option<Sender<PositionEvent>>,
}

/// Push side of a [`ChannelSource`]
#[derive(Debug, Clone)]
pub struct PositionFeed {
    state: Arc<Mutex<FeedState>>,
}

impl PositionFeed {
    /// Deliver an event to the active subscription
    ///
    /// Returns false when nobody is watching or the channel is full; the
    /// event is dropped in both cases.
    pub fn push(&self, event: PositionEvent) -> bool {
        let Ok(state) = self.state.lock() else {
            return false;
        };
        match state.tx.as_ref() {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Position feed full, dropping event");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            },
            None => false,
        }
    }

    pub fn push_fix(&self, fix: RawFix) -> bool {
        self.push(PositionEvent::Fix(fix))
    }

    pub fn push_error(&self, error: SourceError) -> bool {
        self.push(PositionEvent::Failed(error))
    }

    pub fn set_permission(&self, permission: PermissionState) {
        if let Ok(mut state) = self.state.lock() {
            state.permission = permission;
        }
    }

    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.available = available;
        }
    }

    pub fn is_watching(&self) -> bool {
        self.state
            .lock()
            .ok()
            .map(|s| s.tx.is_some())
            .unwrap_or(false)
    }
}

/// Source fed by an external callback through a [`PositionFeed`]
#[derive(Debug)]
pub struct ChannelSource {
    state: Arc<Mutex<FeedState>>,
}

impl ChannelSource {
    /// Available source with permission granted, plus its feed handle
    pub fn new() -> (Self, PositionFeed) {
        let state = Arc::new(Mutex::new(FeedState {
            available: true,
            permission: PermissionState::Granted,
            tx: None,
        }));
        let feed = PositionFeed {
            state: Arc::clone(&state),
        };
        (ChannelSource { state }, feed)
    }
}

impl PositionSource for ChannelSource {
    fn is_available(&self) -> bool {
        self.state.lock().map(|s| s.available).unwrap_or(false)
    }

    fn permission(&self) -> PermissionState {
        self.state
            .lock()
            .map(|s| s.permission)
            .unwrap_or(PermissionState::Denied)
    }

    fn watch(&mut self) -> Result<Receiver<PositionEvent>, SourceError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SourceError::Unavailable("feed lock poisoned".to_string()))?;
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        state.tx = Some(tx);
        Ok(rx)
    }

    fn unwatch(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.tx = None;
        }
    }
}

/// Streams a recorded fix log into the tracker
pub struct ReplaySource {
    fixes: Vec<RawFix>,
    /// Delay between fixes, `None` replays as fast as the tracker drains
    pace: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(fixes: Vec<RawFix>) -> Self {
        Self {
            fixes,
            pace: None,
            task: None,
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Load a JSON array of `{lat, lng, timestamp, speed}` fixes
    pub fn from_file(path: &Path) -> TrackResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let fixes: Vec<RawFix> = serde_json::from_reader(reader)?;
        log::info!("Loaded {} fixes from {}", fixes.len(), path.display());
        Ok(Self::new(fixes))
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

async fn replay_loop(tx: Sender<PositionEvent>, fixes: Vec<RawFix>, pace: Option<Duration>) {
    let mut sent = 0usize;
    for fix in fixes {
        if let Some(delay) = pace {
            sleep(delay).await;
        }
        if tx.send(PositionEvent::Fix(fix)).await.is_err() {
            log::debug!("Replay channel closed after {} fixes", sent);
            return;
        }
        sent += 1;
    }
    log::debug!("Replay finished, {} fixes sent", sent);
}

impl PositionSource for ReplaySource {
    fn is_available(&self) -> bool {
        true
    }

    fn permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn watch(&mut self) -> Result<Receiver<PositionEvent>, SourceError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| SourceError::Unavailable("replay needs a tokio runtime".to_string()))?;

        self.unwatch();
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.task = Some(handle.spawn(replay_loop(tx, self.fixes.clone(), self.pace)));
        Ok(rx)
    }

    fn unwatch(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_messages() {
        assert_eq!(
            SourceError::Unavailable("no fix".to_string()).to_string(),
            "Position unavailable: no fix"
        );
        assert_eq!(
            SourceError::Timeout.to_string(),
            "Timed out waiting for a position fix"
        );
        let err: Box<dyn std::error::Error> = Box::new(SourceError::PermissionDenied);
        assert_eq!(err.to_string(), "Location permission denied");
    }

    #[test]
    fn test_feed_without_watcher_drops() {
        let (_source, feed) = ChannelSource::new();
        assert!(!feed.is_watching());
        assert!(!feed.push_fix(RawFix::new(0.0, 0.0, 0, None)));
    }

    #[test]
    fn test_watch_unwatch() {
        let (mut source, feed) = ChannelSource::new();
        let mut rx = source.watch().unwrap();

        assert!(feed.push_fix(RawFix::new(1.0, 2.0, 3, Some(4.0))));
        assert_eq!(
            rx.try_recv().unwrap(),
            PositionEvent::Fix(RawFix::new(1.0, 2.0, 3, Some(4.0)))
        );

        source.unwatch();
        source.unwatch();
        assert!(!feed.is_watching());
        assert!(!feed.push_error(SourceError::Timeout));
    }

    #[test]
    fn test_feed_controls_permission() {
        let (source, feed) = ChannelSource::new();
        assert_eq!(source.permission(), PermissionState::Granted);
        feed.set_permission(PermissionState::Denied);
        assert_eq!(source.permission(), PermissionState::Denied);
        feed.set_available(false);
        assert!(!source.is_available());
    }

    #[test]
    fn test_replay_requires_runtime() {
        let mut source = ReplaySource::new(vec![]);
        assert!(matches!(source.watch(), Err(SourceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_replay_streams_in_order() {
        let fixes = vec![
            RawFix::new(0.0, 0.0, 0, Some(10.0)),
            RawFix::new(0.0, 0.001, 4000, Some(11.0)),
        ];
        let mut source = ReplaySource::new(fixes.clone());
        let mut rx = source.watch().unwrap();

        assert_eq!(rx.recv().await, Some(PositionEvent::Fix(fixes[0])));
        assert_eq!(rx.recv().await, Some(PositionEvent::Fix(fixes[1])));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_source_error_display() {
        assert_eq!(
            SourceError::Unavailable("no fix".to_string()).to_string(),
            "Position unavailable: no fix"
        );
    }
}
