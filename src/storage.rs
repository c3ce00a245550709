use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{TrackResult, TrackerError};
use crate::types::{CurrentSession, LocationPoint, StoredSession, TrackingSession, TrackingStats};

/// Persistence sink for the in-progress autosave and completed sessions
pub trait SessionStore: Send {
    /// Overwrite the autosave slot
    fn put_current(&mut self, history: &[LocationPoint], stats: &TrackingStats) -> TrackResult<()>;

    fn load_current(&self) -> TrackResult<Option<CurrentSession>>;

    fn clear_current(&mut self) -> TrackResult<()>;

    /// Store a completed session, returns its id
    fn add_session(&mut self, session: TrackingSession) -> TrackResult<u64>;

    /// Saved sessions, most recent end time first
    fn list_sessions(&self) -> TrackResult<Vec<StoredSession>>;

    fn get_session(&self, id: u64) -> TrackResult<Option<StoredSession>>;
}

fn sort_recent_first(sessions: &mut [StoredSession]) {
    sessions.sort_by(|a, b| {
        b.session
            .end_time
            .cmp(&a.session.end_time)
            .then(b.id.cmp(&a.id))
    });
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: Option<CurrentSession>,
    sessions: Vec<StoredSession>,
    next_id: u64,
    /// Autosave writes since creation
    pub put_count: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn put_current(&mut self, history: &[LocationPoint], stats: &TrackingStats) -> TrackResult<()> {
        self.current = Some(CurrentSession {
            location_history: history.to_vec(),
            stats: *stats,
        });
        self.put_count += 1;
        Ok(())
    }

    fn load_current(&self) -> TrackResult<Option<CurrentSession>> {
        Ok(self.current.clone())
    }

    fn clear_current(&mut self) -> TrackResult<()> {
        self.current = None;
        Ok(())
    }

    fn add_session(&mut self, session: TrackingSession) -> TrackResult<u64> {
        self.next_id += 1;
        let id = self.next_id;
        self.sessions.push(StoredSession { id, session });
        Ok(id)
    }

    fn list_sessions(&self) -> TrackResult<Vec<StoredSession>> {
        let mut sessions = self.sessions.clone();
        sort_recent_first(&mut sessions);
        Ok(sessions)
    }

    fn get_session(&self, id: u64) -> TrackResult<Option<StoredSession>> {
        Ok(self.sessions.iter().find(|s| s.id == id).cloned())
    }
}

/// Directory-backed JSON store
///
/// # Layout
/// - `{root}/current_session.json` autosave slot
/// - `{root}/sessions/session_{id}.json` one file per saved session
pub struct JsonFileStore {
    root: PathBuf,
    next_id: u64,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> TrackResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("sessions"))?;

        let mut store = JsonFileStore { root, next_id: 0 };
        store.next_id = store
            .session_ids()?
            .into_iter()
            .max()
            .unwrap_or(0);
        log::debug!(
            "Opened session store at {} (last id {})",
            store.root.display(),
            store.next_id
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn current_path(&self) -> PathBuf {
        self.root.join("current_session.json")
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn session_path(&self, id: u64) -> PathBuf {
        self.sessions_dir().join(format!("session_{}.json", id))
    }

    fn session_ids(&self) -> TrackResult<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.sessions_dir())? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix("session_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn read_session(&self, id: u64) -> TrackResult<StoredSession> {
        let text = fs::read_to_string(self.session_path(id))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write via a temp file so a crash never leaves a truncated JSON
    fn write_json(path: &Path, json: &str) -> TrackResult<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn put_current(&mut self, history: &[LocationPoint], stats: &TrackingStats) -> TrackResult<()> {
        let current = CurrentSession {
            location_history: history.to_vec(),
            stats: *stats,
        };
        let json = serde_json::to_string(&current)?;
        Self::write_json(&self.current_path(), &json)
    }

    fn load_current(&self) -> TrackResult<Option<CurrentSession>> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn clear_current(&mut self) -> TrackResult<()> {
        match fs::remove_file(self.current_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn add_session(&mut self, session: TrackingSession) -> TrackResult<u64> {
        let id = self.next_id + 1;
        let stored = StoredSession { id, session };
        let json = serde_json::to_string_pretty(&stored)?;
        Self::write_json(&self.session_path(id), &json)?;
        self.next_id = id;
        log::info!("Saved session {} \"{}\"", id, stored.session.name);
        Ok(id)
    }

    fn list_sessions(&self) -> TrackResult<Vec<StoredSession>> {
        let mut sessions = Vec::new();
        for id in self.session_ids()? {
            match self.read_session(id) {
                Ok(s) => sessions.push(s),
                Err(TrackerError::Serialization(msg)) => {
                    log::warn!("Skipping unreadable session {}: {}", id, msg);
                }
                Err(e) => return Err(e),
            }
        }
        sort_recent_first(&mut sessions);
        Ok(sessions)
    }

    fn get_session(&self, id: u64) -> TrackResult<Option<StoredSession>> {
        if !self.session_path(id).exists() {
            return Ok(None);
        }
        self.read_session(id).map(Some)
    }
}
