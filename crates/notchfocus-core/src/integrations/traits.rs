use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timer::Reminder;

/// Identifier of a short sound cue (asset name, system sound, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CueId(String);

impl CueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CueId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Fire-and-forget sound playback.
///
/// At most one cue is audible at a time; starting a new one replaces the
/// previous one.
pub trait CuePlayer: Send + Sync {
    /// Returns whether playback started. Unavailable assets and playback
    /// failures return `false`.
    fn play(&self, cue: &CueId) -> bool;
}

/// Posts and withdraws the "almost done" reminder.
pub trait ReminderNotifier: Send + Sync {
    /// Returns whether the reminder was delivered. Denied permissions or an
    /// unavailable notification center return `false`.
    fn post(&self, reminder: &Reminder) -> bool;

    /// Withdraw a previously posted reminder. Unknown ids are ignored.
    fn withdraw(&self, reminder_id: &str);
}

/// Shows or hides the full-screen break block on every display.
pub trait BreakPresenter: Send + Sync {
    fn set_blocking(&self, blocking: bool);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCuePlayer;

impl CuePlayer for SilentCuePlayer {
    fn play(&self, _cue: &CueId) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ReminderNotifier for NullNotifier {
    fn post(&self, _reminder: &Reminder) -> bool {
        false
    }

    fn withdraw(&self, _reminder_id: &str) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl BreakPresenter for NullPresenter {
    fn set_blocking(&self, _blocking: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_id_is_transparent_in_json() {
        let cue = CueId::new("glass");
        assert_eq!(serde_json::to_string(&cue).unwrap(), "\"glass\"");
        assert_eq!(cue.to_string(), "glass");
    }

    #[test]
    fn silent_player_never_starts() {
        assert!(!SilentCuePlayer.play(&CueId::from("tick")));
    }
}
