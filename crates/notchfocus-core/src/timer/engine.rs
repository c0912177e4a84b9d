//! Session engine implementation.
//!
//! The session engine is a deadline-based state machine. It does not use
//! internal threads and never counts time down itself: while running it keeps
//! an absolute `phase_end` instant, and every query or `tick()` recomputes the
//! remaining time from the injected [`Clock`]. A tick that arrives late, or not
//! at all because the machine slept, therefore cannot skew the timeline.
//!
//! ## State Transitions
//!
//! ```text
//! Idle ──start──> Running <──pause/resume──> Paused
//!                    │ deadline reached / skip
//!                    v
//!         completion cascade ──> next phase (Running or Paused)
//! ```
//!
//! Focus completes into a short or long break (long every
//! `cycle_before_long_break` focus phases), a break completes into focus.
//! Whether the next phase starts running is decided by the auto-start flags.
//!
//! Every successful mutation writes the snapshot through the
//! [`SnapshotStore`]. Write failures are logged and otherwise ignored.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::phase::{minutes_to_ms, Phase, RunState, TimerConfig, MAX_PHASE_MS, MS_PER_MINUTE};
use crate::clock::Clock;
use crate::events::Event;
use crate::integrations::{CueId, CuePlayer};
use crate::storage::{PersistedSession, SnapshotStore};

/// Remaining time at which the countdown cue plays.
pub const COUNTDOWN_CUE_THRESHOLD_MS: u64 = 6_000;

/// Read-only view of the session after a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub phase: Phase,
    pub run_state: RunState,
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub phase_end: Option<DateTime<Utc>>,
    pub completed_focus_count: u64,
    pub strict_mode_bypassed: bool,
    pub at: DateTime<Utc>,
}

impl SessionView {
    pub fn is_running_focus(&self) -> bool {
        self.phase == Phase::Focus && self.run_state == RunState::Running
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        if self.total_ms == 0 {
            return 0.0;
        }
        (1.0 - self.remaining_ms as f64 / self.total_ms as f64).clamp(0.0, 1.0)
    }
}

/// Core session engine.
///
/// Owns the session exclusively; hosts serialize access to it (see
/// [`FocusController`](crate::FocusController)).
pub struct SessionEngine {
    config: TimerConfig,
    phase: Phase,
    run_state: RunState,
    /// Authoritative remaining time while not running.
    paused_remaining_ms: u64,
    /// Absolute deadline, set iff running.
    phase_end: Option<DateTime<Utc>>,
    completed_focus_count: u64,
    strict_mode_bypassed: bool,
    /// Last published remaining time.
    remaining_ms: u64,
    /// Length of the current phase, including extensions.
    total_ms: u64,
    countdown_cue_fired: bool,
    clock: Arc<dyn Clock>,
    store: Box<dyn SnapshotStore>,
    cues: Arc<dyn CuePlayer>,
}

impl SessionEngine {
    /// Create a fresh engine: idle, focus phase, full focus duration.
    ///
    /// Nothing is persisted until the first mutation.
    pub fn new(
        config: TimerConfig,
        clock: Arc<dyn Clock>,
        store: Box<dyn SnapshotStore>,
        cues: Arc<dyn CuePlayer>,
    ) -> Self {
        let config = config.clamped();
        let focus_ms = config.duration_ms(Phase::Focus);
        Self {
            config,
            phase: Phase::Focus,
            run_state: RunState::Idle,
            paused_remaining_ms: focus_ms,
            phase_end: None,
            completed_focus_count: 0,
            strict_mode_bypassed: false,
            remaining_ms: focus_ms,
            total_ms: focus_ms,
            countdown_cue_fired: false,
            clock,
            store,
            cues,
        }
    }

    /// Rebuild the engine from the store at process start.
    ///
    /// - Nothing stored, or the record cannot be decoded: fresh engine.
    /// - Idle or paused: restored verbatim.
    /// - Running with time left: keeps running toward the stored deadline.
    ///   A deadline further out than any phase can last is discarded.
    /// - Running past its deadline: exactly one completion cascade runs now,
    ///   however many phase boundaries the downtime actually spanned. The
    ///   returned event describes that cascade.
    pub fn restore(
        config: TimerConfig,
        clock: Arc<dyn Clock>,
        store: Box<dyn SnapshotStore>,
        cues: Arc<dyn CuePlayer>,
    ) -> (Self, Option<Event>) {
        let mut engine = Self::new(config, clock, store, cues);

        let snapshot = match engine.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("no stored session, starting fresh");
                return (engine, None);
            }
            Err(e) => {
                warn!("discarding stored session: {e}");
                return (engine, None);
            }
        };

        let now = engine.clock.now();
        engine.phase = snapshot.phase;
        engine.completed_focus_count = snapshot.completed_focus_sessions;
        engine.total_ms = engine.config.duration_ms(snapshot.phase);

        match (snapshot.state, snapshot.phase_end_timestamp) {
            (RunState::Running, Some(deadline)) => {
                let remaining = ms_until(deadline, now);
                if remaining == 0 {
                    info!(
                        phase = snapshot.phase.as_str(),
                        %deadline,
                        "stored phase expired while not running, completing it"
                    );
                    engine.run_state = RunState::Running;
                    engine.phase_end = Some(deadline);
                    engine.remaining_ms = 0;
                    let event = engine.complete_current_phase(false);
                    return (engine, event);
                }
                if remaining > MAX_PHASE_MS {
                    warn!(%deadline, "stored deadline is out of range, starting fresh");
                    return (Self::fresh_from(engine), None);
                }
                let Some(phase_end) = deadline_after(now, remaining) else {
                    warn!(%deadline, "stored deadline is not representable, restoring paused");
                    engine.pause_at(remaining);
                    engine.countdown_cue_fired = remaining <= COUNTDOWN_CUE_THRESHOLD_MS;
                    return (engine, None);
                };
                engine.run_state = RunState::Running;
                engine.phase_end = Some(phase_end);
                engine.remaining_ms = remaining;
                engine.paused_remaining_ms = remaining;
                engine.total_ms = engine.total_ms.max(remaining);
                info!(
                    phase = snapshot.phase.as_str(),
                    remaining_ms = remaining,
                    "resumed running session"
                );
            }
            (RunState::Running, None) => {
                warn!("stored running session has no deadline, restoring it paused");
                engine.pause_at(snapshot.paused_remaining_ms());
            }
            (state, _) => {
                engine.run_state = state;
                engine.paused_remaining_ms = snapshot.paused_remaining_ms();
                engine.remaining_ms = engine.paused_remaining_ms;
                engine.total_ms = engine.total_ms.max(engine.paused_remaining_ms);
                debug!(phase = snapshot.phase.as_str(), ?state, "restored session");
            }
        }

        // The crossing happened while nobody was watching.
        engine.countdown_cue_fired = engine.remaining_ms <= COUNTDOWN_CUE_THRESHOLD_MS;
        (engine, None)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Remaining time as of the last mutation or tick.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Remaining time recomputed against the clock right now.
    pub fn current_remaining_ms(&self) -> u64 {
        match self.phase_end {
            Some(deadline) if self.run_state == RunState::Running => {
                ms_until(deadline, self.clock.now())
            }
            _ => self.paused_remaining_ms,
        }
    }

    pub fn paused_remaining_ms(&self) -> u64 {
        self.paused_remaining_ms
    }

    pub fn phase_end(&self) -> Option<DateTime<Utc>> {
        self.phase_end
    }

    pub fn completed_focus_count(&self) -> u64 {
        self.completed_focus_count
    }

    pub fn is_strict_mode_bypassed(&self) -> bool {
        self.strict_mode_bypassed
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            run_state: self.run_state,
            remaining_ms: self.current_remaining_ms(),
            total_ms: self.total_ms,
            phase_end: self.phase_end,
            completed_focus_count: self.completed_focus_count,
            strict_mode_bypassed: self.strict_mode_bypassed,
            at: self.clock.now(),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            run_state: self.run_state,
            remaining_ms: self.current_remaining_ms(),
            total_ms: self.total_ms,
            completed_focus_count: self.completed_focus_count,
            strict_mode_bypassed: self.strict_mode_bypassed,
            phase_end: self.phase_end,
            at: self.clock.now(),
        }
    }

    /// The record written to the store.
    pub fn persisted(&self) -> PersistedSession {
        PersistedSession {
            phase: self.phase,
            state: self.run_state,
            paused_remaining_seconds: self.paused_remaining_ms as f64 / 1000.0,
            phase_end_timestamp: self.phase_end,
            completed_focus_sessions: self.completed_focus_count,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a focus phase now, whatever the current phase is.
    pub fn start(&mut self) -> Option<Event> {
        self.begin(Phase::Focus, true);
        Some(Event::SessionStarted {
            phase: Phase::Focus,
            duration_secs: self.total_ms / 1000,
            at: self.clock.now(),
        })
    }

    pub fn toggle_play_pause(&mut self) -> Option<Event> {
        match self.run_state {
            RunState::Idle => self.start(),
            RunState::Running => self.pause(),
            RunState::Paused => self.resume(),
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        let remaining = self.current_remaining_ms();
        self.pause_at(remaining);
        self.persist();
        debug!(phase = self.phase.as_str(), remaining_ms = remaining, "paused");
        Some(Event::Paused {
            phase: self.phase,
            remaining_ms: remaining,
            at: self.clock.now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.run_state != RunState::Paused {
            return None;
        }
        let now = self.clock.now();
        let Some(phase_end) = deadline_after(now, self.paused_remaining_ms) else {
            warn!(
                remaining_ms = self.paused_remaining_ms,
                "cannot schedule a deadline, staying paused"
            );
            return None;
        };
        self.phase_end = Some(phase_end);
        self.run_state = RunState::Running;
        self.remaining_ms = self.paused_remaining_ms;
        self.persist();
        debug!(
            phase = self.phase.as_str(),
            remaining_ms = self.remaining_ms,
            "resumed"
        );
        Some(Event::Resumed {
            phase: self.phase,
            remaining_ms: self.remaining_ms,
            at: now,
        })
    }

    /// Back to idle focus with a full duration and a zero focus count.
    pub fn reset(&mut self) -> Option<Event> {
        let focus_ms = self.config.duration_ms(Phase::Focus);
        self.phase = Phase::Focus;
        self.run_state = RunState::Idle;
        self.phase_end = None;
        self.paused_remaining_ms = focus_ms;
        self.remaining_ms = focus_ms;
        self.total_ms = focus_ms;
        self.completed_focus_count = 0;
        self.strict_mode_bypassed = false;
        self.countdown_cue_fired = false;
        self.persist();
        debug!("reset");
        Some(Event::Reset {
            at: self.clock.now(),
        })
    }

    /// End the current phase now and run the completion cascade.
    pub fn skip(&mut self) -> Option<Event> {
        self.play_end_cue();
        self.complete_current_phase(true)
    }

    /// Skip, but only out of a focus phase.
    pub fn start_next_break_now(&mut self) -> Option<Event> {
        if self.phase != Phase::Focus {
            return None;
        }
        self.skip()
    }

    /// Add time to the current focus phase. No-op while idle or on a break.
    ///
    /// Remaining time saturates at [`MAX_PHASE_MS`]; the event reports the
    /// minutes actually added, rounded up. Returns `None` once nothing more
    /// fits.
    pub fn extend_current_focus(&mut self, minutes: u64) -> Option<Event> {
        if self.phase != Phase::Focus || minutes == 0 || !self.run_state.is_active() {
            return None;
        }
        let remaining = self.current_remaining_ms();
        let added_ms = minutes_to_ms(minutes).min(MAX_PHASE_MS.saturating_sub(remaining));
        if added_ms == 0 {
            debug!(remaining_ms = remaining, "focus already at its longest");
            return None;
        }
        match self.run_state {
            RunState::Running => {
                let deadline = deadline_after(self.phase_end?, added_ms)?;
                self.phase_end = Some(deadline);
                self.remaining_ms = self.current_remaining_ms();
            }
            _ => {
                self.paused_remaining_ms = remaining + added_ms;
                self.remaining_ms = self.paused_remaining_ms;
            }
        }
        let minutes = added_ms.div_ceil(MS_PER_MINUTE);
        self.total_ms = self.total_ms.saturating_add(added_ms);
        if self.remaining_ms > COUNTDOWN_CUE_THRESHOLD_MS {
            self.countdown_cue_fired = false;
        }
        self.persist();
        debug!(
            added_minutes = minutes,
            remaining_ms = self.remaining_ms,
            "extended focus"
        );
        Some(Event::FocusExtended {
            added_minutes: minutes,
            remaining_ms: self.remaining_ms,
            at: self.clock.now(),
        })
    }

    /// Lift strict mode for the rest of the current break.
    pub fn bypass_strict_mode_for_current_break(&mut self) -> Option<Event> {
        if !self.phase.is_break() || self.strict_mode_bypassed {
            return None;
        }
        self.strict_mode_bypassed = true;
        self.persist();
        debug!(phase = self.phase.as_str(), "strict mode bypassed");
        Some(Event::StrictModeBypassed {
            phase: self.phase,
            at: self.clock.now(),
        })
    }

    /// Re-check the deadline. Call periodically; returns
    /// `Some(Event::PhaseCompleted)` when the phase ran out.
    pub fn tick(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        let remaining = self.current_remaining_ms();
        self.remaining_ms = remaining;
        if remaining > 0 {
            if !self.countdown_cue_fired && remaining <= COUNTDOWN_CUE_THRESHOLD_MS {
                self.countdown_cue_fired = true;
                if let Some(cue) = &self.config.tick_cue {
                    self.play_cue(cue);
                }
            }
            return None;
        }
        self.play_end_cue();
        self.complete_current_phase(false)
    }

    /// Replace the configuration. A phase already in progress keeps its
    /// deadline; new durations apply from the next time a phase begins.
    pub fn set_config(&mut self, config: TimerConfig) {
        self.config = config.clamped();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_current_phase(&mut self, skipped: bool) -> Option<Event> {
        let completed = self.phase;
        let (next, start_now) = match completed {
            Phase::Focus => {
                self.completed_focus_count = self.completed_focus_count.saturating_add(1);
                (
                    self.config.break_after(self.completed_focus_count),
                    self.config.auto_start_breaks,
                )
            }
            Phase::ShortBreak | Phase::LongBreak => (Phase::Focus, self.config.auto_start_focus),
        };
        info!(
            completed = completed.as_str(),
            next = next.as_str(),
            completed_focus_count = self.completed_focus_count,
            skipped,
            "phase completed"
        );
        self.begin(next, start_now);
        Some(Event::PhaseCompleted {
            completed,
            next,
            completed_focus_count: self.completed_focus_count,
            started_running: start_now,
            skipped,
            at: self.clock.now(),
        })
    }

    fn begin(&mut self, phase: Phase, start_now: bool) {
        self.phase = phase;
        if phase == Phase::Focus {
            self.strict_mode_bypassed = false;
        }
        let duration = self.config.duration_ms(phase);
        self.total_ms = duration;
        self.remaining_ms = duration;
        self.paused_remaining_ms = duration;
        self.countdown_cue_fired = false;
        match deadline_after(self.clock.now(), duration).filter(|_| start_now) {
            Some(phase_end) => {
                self.run_state = RunState::Running;
                self.phase_end = Some(phase_end);
            }
            None => {
                if start_now {
                    warn!(phase = phase.as_str(), "cannot schedule a deadline, waiting paused");
                }
                self.run_state = RunState::Paused;
                self.phase_end = None;
            }
        }
        self.persist();
    }

    /// Drop restored state, keeping config and collaborators.
    fn fresh_from(engine: Self) -> Self {
        Self::new(engine.config, engine.clock, engine.store, engine.cues)
    }

    fn pause_at(&mut self, remaining: u64) {
        self.run_state = RunState::Paused;
        self.phase_end = None;
        self.paused_remaining_ms = remaining;
        self.remaining_ms = remaining;
    }

    fn play_end_cue(&self) {
        if let Some(cue) = &self.config.end_cue {
            self.play_cue(cue);
        }
    }

    fn play_cue(&self, cue: &CueId) {
        if !self.cues.play(cue) {
            debug!(%cue, "cue did not play");
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.persisted()) {
            warn!("failed to persist session: {e}");
        }
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("phase", &self.phase)
            .field("run_state", &self.run_state)
            .field("paused_remaining_ms", &self.paused_remaining_ms)
            .field("phase_end", &self.phase_end)
            .field("completed_focus_count", &self.completed_focus_count)
            .field("strict_mode_bypassed", &self.strict_mode_bypassed)
            .finish_non_exhaustive()
    }
}

fn ms_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((deadline - now).num_milliseconds()).unwrap_or(0)
}

/// `from + ms`, or `None` when chrono cannot represent the instant.
fn deadline_after(from: DateTime<Utc>, ms: u64) -> Option<DateTime<Utc>> {
    let delta = Duration::try_milliseconds(i64::try_from(ms).ok()?)?;
    from.checked_add_signed(delta)
}
