use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, RunState};

/// Every state change in the session engine produces an Event.
/// Hosts print them, record completed phases from them, or ignore them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    Paused {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    Reset {
        at: DateTime<Utc>,
    },
    /// A phase ended, either by running out or by an explicit skip, and the
    /// next phase has begun.
    PhaseCompleted {
        completed: Phase,
        next: Phase,
        completed_focus_count: u64,
        /// Whether `next` started running immediately (auto-start).
        started_running: bool,
        skipped: bool,
        at: DateTime<Utc>,
    },
    FocusExtended {
        added_minutes: u64,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    StrictModeBypassed {
        phase: Phase,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        run_state: RunState,
        remaining_ms: u64,
        total_ms: u64,
        completed_focus_count: u64,
        strict_mode_bypassed: bool,
        phase_end: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::SessionStarted { at, .. }
            | Event::Paused { at, .. }
            | Event::Resumed { at, .. }
            | Event::Reset { at }
            | Event::PhaseCompleted { at, .. }
            | Event::FocusExtended { at, .. }
            | Event::StrictModeBypassed { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}
