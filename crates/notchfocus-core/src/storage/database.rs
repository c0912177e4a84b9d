//! SQLite-backed storage.
//!
//! Provides:
//! - Key-value store for application state (the session snapshot lives here)
//! - History of completed and skipped phases
//! - Focus statistics (daily and all-time)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::snapshot::{PersistedSession, SnapshotStore};
use crate::error::{CoreError, PersistError};
use crate::timer::Phase;

/// KV key of the session snapshot.
pub const SNAPSHOT_KEY: &str = "session_snapshot";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: i64,
    pub phase: String,
    pub planned_min: u64,
    pub skipped: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_phases: u64,
    pub completed_focus: u64,
    pub skipped_focus: u64,
    pub skipped_breaks: u64,
    pub total_focus_min: u64,
    pub total_break_min: u64,
    pub today_focus: u64,
    pub today_focus_min: u64,
}

/// SQLite database for the session snapshot and phase history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/notchfocus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be
    /// opened, or the schema cannot be created.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("notchfocus.db");
        Self::open_at(path).map_err(|e| PersistError::from(e).into())
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS phases (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                phase        TEXT NOT NULL,
                planned_min  INTEGER NOT NULL,
                skipped      INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_phases_completed_at ON phases(completed_at);
            CREATE INDEX IF NOT EXISTS idx_phases_phase ON phases(phase);",
        )?;
        Ok(())
    }

    /// Record a finished phase.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_phase(
        &self,
        phase: Phase,
        planned_min: u64,
        skipped: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO phases (phase, planned_min, skipped, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                phase.as_str(),
                planned_min,
                skipped,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent phases first.
    pub fn recent_phases(&self, limit: usize) -> Result<Vec<PhaseRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, planned_min, skipped, completed_at
             FROM phases
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let completed_at: String = row.get(4)?;
            Ok(PhaseRecord {
                id: row.get(0)?,
                phase: row.get(1)?,
                planned_min: row.get(2)?,
                skipped: row.get(3)?,
                completed_at: DateTime::parse_from_rfc3339(&completed_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_default(),
            })
        })?;
        rows.collect()
    }

    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        let since = day_start(Utc::now());
        let mut stats = self.aggregate(Some(&since))?;
        stats.today_focus = stats.completed_focus;
        stats.today_focus_min = stats.total_focus_min;
        Ok(stats)
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        self.stats_as_of(Utc::now())
    }

    /// All-time totals plus the "today" figures for the UTC day of `now`.
    pub fn stats_as_of(&self, now: DateTime<Utc>) -> Result<Stats, rusqlite::Error> {
        let mut stats = self.aggregate(None)?;
        let today = self.aggregate(Some(&day_start(now)))?;
        stats.today_focus = today.completed_focus;
        stats.today_focus_min = today.total_focus_min;
        Ok(stats)
    }

    fn aggregate(&self, since: Option<&str>) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT phase, skipped, COUNT(*), COALESCE(SUM(planned_min), 0)
             FROM phases
             WHERE completed_at >= ?1
             GROUP BY phase, skipped",
        )?;
        let rows = stmt.query_map(params![since.unwrap_or("")], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let (phase, skipped, count, minutes) = row?;
            stats.total_phases += count;
            match (phase.as_str(), skipped) {
                ("focus", false) => {
                    stats.completed_focus += count;
                    stats.total_focus_min += minutes;
                }
                ("focus", true) => stats.skipped_focus += count,
                (_, false) => stats.total_break_min += minutes,
                (_, true) => stats.skipped_breaks += count,
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn day_start(now: DateTime<Utc>) -> String {
    format!("{}T00:00:00+00:00", now.format("%Y-%m-%d"))
}

impl SnapshotStore for Database {
    fn save(&self, snapshot: &PersistedSession) -> Result<(), PersistError> {
        let json = snapshot.to_json()?;
        self.kv_set(SNAPSHOT_KEY, &json)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedSession>, PersistError> {
        match self.kv_get(SNAPSHOT_KEY)? {
            Some(raw) => PersistedSession::from_json(&raw).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::RunState;

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_phase(Phase::Focus, 25, false, now).unwrap();
        db.record_phase(Phase::ShortBreak, 5, false, now).unwrap();
        db.record_phase(Phase::Focus, 25, true, now).unwrap();
        db.record_phase(Phase::LongBreak, 15, true, now).unwrap();

        let stats = db.stats_as_of(now).unwrap();
        assert_eq!(stats.total_phases, 4);
        assert_eq!(stats.completed_focus, 1);
        assert_eq!(stats.skipped_focus, 1);
        assert_eq!(stats.skipped_breaks, 1);
        assert_eq!(stats.total_focus_min, 25);
        assert_eq!(stats.total_break_min, 5);
        assert_eq!(stats.today_focus, 1);
        assert_eq!(stats.today_focus_min, 25);
    }

    #[test]
    fn yesterday_is_not_today() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_phase(Phase::Focus, 25, false, now - chrono::Duration::days(2))
            .unwrap();
        let stats = db.stats_as_of(now).unwrap();
        assert_eq!(stats.completed_focus, 1);
        assert_eq!(stats.today_focus, 0);
    }

    #[test]
    fn recent_phases_newest_first() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_phase(Phase::Focus, 25, false, now - chrono::Duration::minutes(30))
            .unwrap();
        db.record_phase(Phase::ShortBreak, 5, true, now).unwrap();

        let recent = db.recent_phases(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].phase, "shortBreak");
        assert!(recent[0].skipped);
        assert_eq!(recent[1].phase, "focus");
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn snapshot_round_trips_through_kv() {
        let db = Database::open_memory().unwrap();
        assert!(SnapshotStore::load(&db).unwrap().is_none());

        let snapshot = PersistedSession {
            phase: Phase::Focus,
            state: RunState::Running,
            paused_remaining_seconds: 0.0,
            phase_end_timestamp: Some(Utc::now()),
            completed_focus_sessions: 7,
        };
        SnapshotStore::save(&db, &snapshot).unwrap();
        assert_eq!(SnapshotStore::load(&db).unwrap(), Some(snapshot));
    }

    #[test]
    fn corrupt_snapshot_is_a_decode_error() {
        let db = Database::open_memory().unwrap();
        db.kv_set(SNAPSHOT_KEY, "garbage").unwrap();
        assert!(matches!(
            SnapshotStore::load(&db),
            Err(PersistError::Decode(_))
        ));
    }
}
