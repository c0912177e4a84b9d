//! TOML-based application configuration.
//!
//! Stores user preferences for the session engine:
//! - Phase durations and long-break cadence
//! - Auto-start behaviour for breaks and focus
//! - Strict mode and its emergency-exit binding
//! - Reminder notifications
//! - Sound cues
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::integrations::CueId;
use crate::timer::{EscapeGesture, StrictPolicy, TimerConfig};

/// Binding name of the bare escape key.
pub const ESCAPE_BINDING: &str = "escape";
pub const DEFAULT_DOUBLE_PRESS_INTERVAL_MS: u64 = 650;

/// Phase durations and cycling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_cycle_before_long_break")]
    pub cycle_before_long_break: u32,
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_focus: bool,
}

/// Strict mode (blocking break overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrictModeConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Binding that leaves an enforced break. `"escape"` requires a double
    /// press; any other binding skips on a single press.
    #[serde(default = "default_emergency_exit_binding")]
    pub emergency_exit_binding: String,
    #[serde(default = "default_double_press_interval_ms")]
    pub double_press_interval_ms: u64,
}

/// Reminder notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Sound cues. `None` disables the cue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CueConfig {
    /// Played once when a phase crosses the countdown mark.
    #[serde(default)]
    pub tick_cue: Option<String>,
    /// Played when a phase ends or is skipped.
    #[serde(default)]
    pub end_cue: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Master switch for the focus timer feature of the notch.
    #[serde(default = "default_true")]
    pub pomodoro_enabled: bool,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub strict_mode: StrictModeConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub cues: CueConfig,
}

// Default functions
fn default_focus_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_cycle_before_long_break() -> u32 {
    4
}
fn default_emergency_exit_binding() -> String {
    ESCAPE_BINDING.into()
}
fn default_double_press_interval_ms() -> u64 {
    DEFAULT_DOUBLE_PRESS_INTERVAL_MS
}
fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            cycle_before_long_break: default_cycle_before_long_break(),
            auto_start_breaks: true,
            auto_start_focus: false,
        }
    }
}

impl Default for StrictModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            emergency_exit_binding: default_emergency_exit_binding(),
            double_press_interval_ms: DEFAULT_DOUBLE_PRESS_INTERVAL_MS,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pomodoro_enabled: true,
            schedule: ScheduleConfig::default(),
            strict_mode: StrictModeConfig::default(),
            notifications: NotificationsConfig::default(),
            cues: CueConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a non-negative integer")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                serde_json::Value::String(_) | serde_json::Value::Null => {
                    if value.is_empty() || value == "none" {
                        serde_json::Value::Null
                    } else {
                        serde_json::Value::String(value.into())
                    }
                }
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing defaults if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("falling back to default configuration: {e}");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key without touching disk.
    ///
    /// The new value keeps the type of the old one. Optional string values
    /// are cleared with `""` or `"none"`.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Engine configuration; durations and cycle clamped to at least 1.
    pub fn timer_config(&self) -> TimerConfig {
        let cue = |id: &Option<String>| {
            id.as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(CueId::new)
        };
        TimerConfig::new(
            self.schedule.focus_minutes as u64,
            self.schedule.short_break_minutes as u64,
            self.schedule.long_break_minutes as u64,
            self.schedule.cycle_before_long_break as u64,
        )
        .with_auto_start(self.schedule.auto_start_breaks, self.schedule.auto_start_focus)
        .with_cues(cue(&self.cues.tick_cue), cue(&self.cues.end_cue))
    }

    pub fn strict_policy(&self) -> StrictPolicy {
        StrictPolicy {
            strict_mode_enabled: self.strict_mode.enabled,
            pomodoro_enabled: self.pomodoro_enabled,
        }
    }

    pub fn escape_gesture(&self) -> EscapeGesture {
        EscapeGesture::new(
            &self.strict_mode.emergency_exit_binding,
            self.strict_mode.double_press_interval_ms,
        )
    }
}
