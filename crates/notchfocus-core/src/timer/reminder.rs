//! "Almost done" reminder for running focus phases.
//!
//! Single slot: at most one reminder is outstanding. It is posted the first
//! time a running focus phase drops to [`REMINDER_THRESHOLD_MS`] or less and
//! withdrawn as soon as the session stops being a running focus phase or
//! notifications are turned off.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::engine::SessionView;
use crate::integrations::ReminderNotifier;

pub const REMINDER_THRESHOLD_MS: u64 = 60_000;

/// Responses offered on the reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderAction {
    StartNextBreakNow,
    AddOneMinute,
    AddFiveMinutes,
    SkipBreak,
}

impl ReminderAction {
    pub const ALL: [ReminderAction; 4] = [
        ReminderAction::StartNextBreakNow,
        ReminderAction::AddOneMinute,
        ReminderAction::AddFiveMinutes,
        ReminderAction::SkipBreak,
    ];

    /// Notification action identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderAction::StartNextBreakNow => "start-next-break-now",
            ReminderAction::AddOneMinute => "add-one-minute",
            ReminderAction::AddFiveMinutes => "add-five-minutes",
            ReminderAction::SkipBreak => "skip-break",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReminderAction::StartNextBreakNow => "Start break now",
            ReminderAction::AddOneMinute => "+1 min",
            ReminderAction::AddFiveMinutes => "+5 min",
            ReminderAction::SkipBreak => "Skip break",
        }
    }

    /// Minutes added to the focus phase, for the extend actions.
    pub fn extension_minutes(self) -> Option<u64> {
        match self {
            ReminderAction::AddOneMinute => Some(1),
            ReminderAction::AddFiveMinutes => Some(5),
            _ => None,
        }
    }
}

impl fmt::Display for ReminderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown reminder action: {0}")]
pub struct UnknownReminderAction(pub String);

impl FromStr for ReminderAction {
    type Err = UnknownReminderAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReminderAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s.trim())
            .ok_or_else(|| UnknownReminderAction(s.to_string()))
    }
}

/// The notification handed to the [`ReminderNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub body: String,
    pub remaining_ms: u64,
    pub actions: Vec<ReminderAction>,
}

impl Reminder {
    fn for_remaining(remaining_ms: u64) -> Self {
        let secs = remaining_ms.div_ceil(1000);
        Self {
            id: format!("focus-reminder-{}", Uuid::new_v4()),
            title: "Focus almost done".into(),
            body: format!("{secs}s left in this focus session."),
            remaining_ms,
            actions: ReminderAction::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ReminderScheduler {
    latched: bool,
    pending: Option<String>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive the reminder from the post-mutation session.
    ///
    /// Returns the reminder when one was posted by this call.
    pub fn evaluate(
        &mut self,
        session: &SessionView,
        notifications_enabled: bool,
        notifier: &dyn ReminderNotifier,
    ) -> Option<Reminder> {
        if !notifications_enabled || !session.is_running_focus() {
            self.withdraw(notifier);
            self.latched = false;
            return None;
        }

        if session.remaining_ms > REMINDER_THRESHOLD_MS {
            // Back above the mark (extended or restarted): the old reminder
            // is stale and a new one may fire later.
            self.withdraw(notifier);
            self.latched = false;
            return None;
        }

        if self.latched || session.remaining_ms == 0 {
            return None;
        }

        self.latched = true;
        let reminder = Reminder::for_remaining(session.remaining_ms);
        if notifier.post(&reminder) {
            self.pending = Some(reminder.id.clone());
            debug!(id = %reminder.id, remaining_ms = session.remaining_ms, "reminder posted");
        } else {
            debug!("reminder not delivered");
        }
        Some(reminder)
    }

    /// Allow another reminder for the current focus phase.
    pub fn rearm(&mut self, notifier: &dyn ReminderNotifier) {
        self.withdraw(notifier);
        self.latched = false;
    }

    pub fn withdraw(&mut self, notifier: &dyn ReminderNotifier) {
        if let Some(id) = self.pending.take() {
            notifier.withdraw(&id);
            debug!(%id, "reminder withdrawn");
        }
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn pending_id(&self) -> Option<&str> {
        self.pending.as_deref()
    }
}
