mod engine;
mod phase;
mod reminder;
mod strict;

pub use engine::{SessionEngine, SessionView, COUNTDOWN_CUE_THRESHOLD_MS};
pub use phase::{Phase, RunState, TimerConfig, MAX_PHASE_MINUTES, MAX_PHASE_MS};
pub use reminder::{
    Reminder, ReminderAction, ReminderScheduler, UnknownReminderAction, REMINDER_THRESHOLD_MS,
};
pub use strict::{should_enforce, EscapeGesture, GestureOutcome, KeyPress, StrictPolicy};
