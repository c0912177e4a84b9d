//! Strict mode - blocking break enforcement
//!
//! While strict mode applies, the host covers every display with a break
//! overlay. Whether it applies is a pure function of configuration and the
//! current session; the overlay itself keeps no state.
//!
//! ## Leaving an enforced break
//!
//! - **Double escape**: two escape presses within the double-press interval
//!   (650 ms by default) skip the break. A single press only arms the gesture.
//! - **Emergency exit**: when the emergency-exit binding is something other
//!   than the bare escape key, one press of it skips the break.
//! - **Bypass**: the session can be told to ignore strict mode for the rest
//!   of the current break.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::engine::SessionView;
use crate::storage::{DEFAULT_DOUBLE_PRESS_INTERVAL_MS, ESCAPE_BINDING};

/// The configuration inputs of the enforcement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrictPolicy {
    pub strict_mode_enabled: bool,
    pub pomodoro_enabled: bool,
}

/// Whether the break overlay must be shown right now.
pub fn should_enforce(policy: StrictPolicy, session: &SessionView) -> bool {
    policy.strict_mode_enabled
        && policy.pomodoro_enabled
        && session.run_state.is_active()
        && session.phase.is_break()
        && !session.strict_mode_bypassed
}

/// A key-down the host forwards while enforcement may be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyPress {
    /// The bare escape key.
    Escape,
    /// The configured emergency-exit hotkey fired.
    EmergencyExit,
    /// Anything else.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Skip the current break.
    Skip,
    /// First press recorded; a second one inside the window skips.
    Armed,
    Ignored,
}

/// Double-press detector for leaving an enforced break.
#[derive(Debug, Clone)]
pub struct EscapeGesture {
    single_press_exit: bool,
    interval: Duration,
    pending_since: Option<Instant>,
}

impl EscapeGesture {
    pub fn new(emergency_exit_binding: &str, interval_ms: u64) -> Self {
        let binding = emergency_exit_binding.trim();
        Self {
            single_press_exit: !binding.is_empty() && !binding.eq_ignore_ascii_case(ESCAPE_BINDING),
            interval: Duration::from_millis(interval_ms),
            pending_since: None,
        }
    }

    /// Whether the emergency-exit binding skips on a single press.
    pub fn is_single_press_exit(&self) -> bool {
        self.single_press_exit
    }

    pub fn is_armed(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn on_key_down(&mut self, key: KeyPress, enforcing: bool) -> GestureOutcome {
        self.on_key_down_at(key, enforcing, Instant::now())
    }

    pub fn on_key_down_at(&mut self, key: KeyPress, enforcing: bool, at: Instant) -> GestureOutcome {
        if !enforcing {
            self.pending_since = None;
            return GestureOutcome::Ignored;
        }

        match key {
            KeyPress::Other => {
                self.pending_since = None;
                GestureOutcome::Ignored
            }
            KeyPress::EmergencyExit if self.single_press_exit => {
                self.pending_since = None;
                GestureOutcome::Skip
            }
            KeyPress::Escape | KeyPress::EmergencyExit => match self.pending_since {
                Some(first) if self.within_window(first, at) => {
                    self.pending_since = None;
                    GestureOutcome::Skip
                }
                _ => {
                    self.pending_since = Some(at);
                    GestureOutcome::Armed
                }
            },
        }
    }

    /// Drop a pending press whose window has passed.
    pub fn expire(&mut self, now: Instant) {
        if let Some(first) = self.pending_since {
            if !self.within_window(first, now) {
                self.pending_since = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.pending_since = None;
    }

    fn within_window(&self, first: Instant, at: Instant) -> bool {
        at.checked_duration_since(first)
            .map(|elapsed| elapsed <= self.interval)
            .unwrap_or(false)
    }
}

impl Default for EscapeGesture {
    fn default() -> Self {
        Self::new(ESCAPE_BINDING, DEFAULT_DOUBLE_PRESS_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Phase, RunState};
    use chrono::Utc;

    fn view(phase: Phase, run_state: RunState, bypassed: bool) -> SessionView {
        SessionView {
            phase,
            run_state,
            remaining_ms: 60_000,
            total_ms: 300_000,
            phase_end: None,
            completed_focus_count: 1,
            strict_mode_bypassed: bypassed,
            at: Utc::now(),
        }
    }

    const ON: StrictPolicy = StrictPolicy {
        strict_mode_enabled: true,
        pomodoro_enabled: true,
    };

    #[test]
    fn enforces_active_unbypassed_breaks_only() {
        assert!(should_enforce(ON, &view(Phase::ShortBreak, RunState::Running, false)));
        assert!(should_enforce(ON, &view(Phase::LongBreak, RunState::Paused, false)));

        assert!(!should_enforce(ON, &view(Phase::Focus, RunState::Running, false)));
        assert!(!should_enforce(ON, &view(Phase::ShortBreak, RunState::Idle, false)));
        assert!(!should_enforce(ON, &view(Phase::ShortBreak, RunState::Running, true)));
    }

    #[test]
    fn both_switches_gate_enforcement() {
        let break_view = view(Phase::ShortBreak, RunState::Running, false);
        let strict_off = StrictPolicy {
            strict_mode_enabled: false,
            ..ON
        };
        let feature_off = StrictPolicy {
            pomodoro_enabled: false,
            ..ON
        };
        assert!(!should_enforce(strict_off, &break_view));
        assert!(!should_enforce(feature_off, &break_view));
    }

    #[test]
    fn double_escape_within_window_skips() {
        let mut gesture = EscapeGesture::default();
        let t0 = Instant::now();
        assert_eq!(gesture.on_key_down_at(KeyPress::Escape, true, t0), GestureOutcome::Armed);
        assert_eq!(
            gesture.on_key_down_at(KeyPress::Escape, true, t0 + Duration::from_millis(400)),
            GestureOutcome::Skip
        );
        assert!(!gesture.is_armed());
    }

    #[test]
    fn presses_too_far_apart_rearm() {
        let mut gesture = EscapeGesture::default();
        let t0 = Instant::now();
        gesture.on_key_down_at(KeyPress::Escape, true, t0);
        assert_eq!(
            gesture.on_key_down_at(KeyPress::Escape, true, t0 + Duration::from_millis(700)),
            GestureOutcome::Armed
        );
        assert!(gesture.is_armed());
    }

    #[test]
    fn unrelated_key_clears_pending_press() {
        let mut gesture = EscapeGesture::default();
        let t0 = Instant::now();
        gesture.on_key_down_at(KeyPress::Escape, true, t0);
        gesture.on_key_down_at(KeyPress::Other, true, t0 + Duration::from_millis(100));
        assert_eq!(
            gesture.on_key_down_at(KeyPress::Escape, true, t0 + Duration::from_millis(200)),
            GestureOutcome::Armed
        );
    }

    #[test]
    fn expire_drops_stale_press() {
        let mut gesture = EscapeGesture::default();
        let t0 = Instant::now();
        gesture.on_key_down_at(KeyPress::Escape, true, t0);
        gesture.expire(t0 + Duration::from_millis(100));
        assert!(gesture.is_armed());
        gesture.expire(t0 + Duration::from_millis(651));
        assert!(!gesture.is_armed());
    }

    #[test]
    fn ignored_when_not_enforcing() {
        let mut gesture = EscapeGesture::default();
        let t0 = Instant::now();
        assert_eq!(gesture.on_key_down_at(KeyPress::Escape, false, t0), GestureOutcome::Ignored);
        assert!(!gesture.is_armed());
    }

    #[test]
    fn custom_binding_skips_on_single_press() {
        let mut gesture = EscapeGesture::new("cmd+shift+e", 650);
        assert!(gesture.is_single_press_exit());
        assert_eq!(
            gesture.on_key_down_at(KeyPress::EmergencyExit, true, Instant::now()),
            GestureOutcome::Skip
        );
    }

    #[test]
    fn escape_binding_needs_double_press() {
        let mut gesture = EscapeGesture::new("Escape", 650);
        assert!(!gesture.is_single_press_exit());
        let t0 = Instant::now();
        assert_eq!(
            gesture.on_key_down_at(KeyPress::EmergencyExit, true, t0),
            GestureOutcome::Armed
        );
        assert_eq!(
            gesture.on_key_down_at(KeyPress::EmergencyExit, true, t0 + Duration::from_millis(300)),
            GestureOutcome::Skip
        );
    }
}
