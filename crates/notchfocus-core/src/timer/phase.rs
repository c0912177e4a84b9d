use serde::{Deserialize, Serialize};

use crate::integrations::CueId;

pub(crate) const MS_PER_MINUTE: u64 = 60 * 1000;

/// Longest a single phase may last, extensions included.
pub const MAX_PHASE_MINUTES: u64 = 7 * 24 * 60;
pub const MAX_PHASE_MS: u64 = MAX_PHASE_MINUTES * MS_PER_MINUTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Focus)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    /// Stable identifier, matches the persisted form.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::ShortBreak => "shortBreak",
            Phase::LongBreak => "longBreak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

impl RunState {
    /// Idle is the only state without an active session.
    pub fn is_active(self) -> bool {
        !matches!(self, RunState::Idle)
    }
}

/// Read-only engine configuration.
///
/// Built through [`TimerConfig::new`] or [`Config::timer_config`](crate::Config::timer_config),
/// both of which clamp every duration to `1..=MAX_PHASE_MINUTES` and the
/// cycle length to at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub focus_minutes: u64,
    pub short_break_minutes: u64,
    pub long_break_minutes: u64,
    pub cycle_before_long_break: u64,
    pub auto_start_breaks: bool,
    pub auto_start_focus: bool,
    pub tick_cue: Option<CueId>,
    pub end_cue: Option<CueId>,
}

impl TimerConfig {
    pub fn new(
        focus_minutes: u64,
        short_break_minutes: u64,
        long_break_minutes: u64,
        cycle_before_long_break: u64,
    ) -> Self {
        Self {
            focus_minutes,
            short_break_minutes,
            long_break_minutes,
            cycle_before_long_break,
            ..Self::default()
        }
        .clamped()
    }

    pub fn with_auto_start(mut self, breaks: bool, focus: bool) -> Self {
        self.auto_start_breaks = breaks;
        self.auto_start_focus = focus;
        self
    }

    pub fn with_cues(mut self, tick_cue: Option<CueId>, end_cue: Option<CueId>) -> Self {
        self.tick_cue = tick_cue;
        self.end_cue = end_cue;
        self
    }

    /// Out-of-range values are pulled into range instead of rejected.
    pub fn clamped(mut self) -> Self {
        self.focus_minutes = self.focus_minutes.clamp(1, MAX_PHASE_MINUTES);
        self.short_break_minutes = self.short_break_minutes.clamp(1, MAX_PHASE_MINUTES);
        self.long_break_minutes = self.long_break_minutes.clamp(1, MAX_PHASE_MINUTES);
        self.cycle_before_long_break = self.cycle_before_long_break.max(1);
        self
    }

    pub fn minutes(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Focus => self.focus_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        }
        .clamp(1, MAX_PHASE_MINUTES)
    }

    /// Phase duration in milliseconds, never above [`MAX_PHASE_MS`].
    pub fn duration_ms(&self, phase: Phase) -> u64 {
        self.minutes(phase) * MS_PER_MINUTE
    }

    /// Break that follows the focus phase which brought the count to
    /// `completed_focus_count`.
    pub fn break_after(&self, completed_focus_count: u64) -> Phase {
        let cycle = self.cycle_before_long_break.max(1);
        if completed_focus_count % cycle == 0 {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            cycle_before_long_break: 4,
            auto_start_breaks: true,
            auto_start_focus: false,
            tick_cue: None,
            end_cue: None,
        }
    }
}

pub(crate) fn minutes_to_ms(minutes: u64) -> u64 {
    minutes.saturating_mul(MS_PER_MINUTE)
}
