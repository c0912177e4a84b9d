mod config;
pub mod database;
mod snapshot;

pub use config::{
    Config, CueConfig, NotificationsConfig, ScheduleConfig, StrictModeConfig,
    DEFAULT_DOUBLE_PRESS_INTERVAL_MS, ESCAPE_BINDING,
};
pub use database::{Database, PhaseRecord, Stats};
pub use snapshot::{MemoryStore, PersistedSession, SnapshotStore};

use std::path::PathBuf;

/// Returns the data directory.
///
/// - `NOTCHFOCUS_DATA_DIR` set: that directory, verbatim.
/// - `NOTCHFOCUS_ENV=dev`: `~/.config/notchfocus-dev/`.
/// - otherwise: `~/.config/notchfocus/`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("NOTCHFOCUS_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("NOTCHFOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("notchfocus-dev")
            } else {
                base_dir.join("notchfocus")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
