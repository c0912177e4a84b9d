//! Persisted session snapshot and the store abstraction behind it.
//!
//! The wire form is deliberately small and stable:
//!
//! ```json
//! {
//!   "phase": "focus",
//!   "state": "running",
//!   "pausedRemainingSeconds": 1500.0,
//!   "phaseEndTimestamp": "2026-10-19T09:25:00Z",
//!   "completedFocusSessions": 3
//! }
//! ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::timer::{Phase, RunState, MAX_PHASE_MS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub phase: Phase,
    pub state: RunState,
    pub paused_remaining_seconds: f64,
    pub phase_end_timestamp: Option<DateTime<Utc>>,
    pub completed_focus_sessions: u64,
}

impl PersistedSession {
    pub fn paused_remaining_ms(&self) -> u64 {
        (self.paused_remaining_seconds * 1000.0).round() as u64
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(|e| PersistError::Encode(e.to_string()))
    }

    /// Decode and sanity-check a stored record.
    ///
    /// The paused remaining time must fit in one phase.
    pub fn from_json(raw: &str) -> Result<Self, PersistError> {
        let snapshot: PersistedSession =
            serde_json::from_str(raw).map_err(|e| PersistError::Decode(e.to_string()))?;
        let secs = snapshot.paused_remaining_seconds;
        if !(0.0..=MAX_PHASE_MS as f64 / 1000.0).contains(&secs) {
            return Err(PersistError::Decode(format!(
                "pausedRemainingSeconds out of range: {secs}"
            )));
        }
        Ok(snapshot)
    }
}

/// Durable home of the session snapshot.
///
/// Both calls are best-effort from the engine's point of view: a failed
/// `save` only costs durability, a failed `load` means "no prior session".
pub trait SnapshotStore: Send {
    fn save(&self, snapshot: &PersistedSession) -> Result<(), PersistError>;

    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<PersistedSession>, PersistError>;
}

/// In-process store.
///
/// Clones share the same slot, so a test can hand one clone to the engine
/// and inspect the other. The record is kept in its encoded form so the
/// decode path is the same one the database goes through.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an arbitrary (possibly corrupt) record.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, snapshot: &PersistedSession) -> Result<(), PersistError> {
        let json = snapshot.to_json()?;
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| PersistError::Storage(e.to_string()))?;
        *slot = Some(json);
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedSession>, PersistError> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| PersistError::Storage(e.to_string()))?;
        slot.as_deref().map(PersistedSession::from_json).transpose()
    }
}
