//! Single owner of the focus session.
//!
//! Every trigger (manual controls, the periodic tick, reminder actions, the
//! emergency-exit hotkey, configuration changes) goes through
//! [`FocusController`]. After each call it re-derives strict-mode
//! enforcement and the reminder from the post-mutation session, then
//! publishes a version-stamped [`ControllerSnapshot`] so that every observer
//! sees the same state.
//!
//! Hosts with several trigger sources share it as a [`SharedController`];
//! the mutex is the serialization point.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::events::Event;
use crate::integrations::{
    BreakPresenter, CuePlayer, NullNotifier, NullPresenter, ReminderNotifier, SilentCuePlayer,
};
use crate::storage::{Config, MemoryStore, SnapshotStore};
use crate::timer::{
    should_enforce, EscapeGesture, GestureOutcome, KeyPress, ReminderAction, ReminderScheduler,
    SessionEngine, SessionView, StrictPolicy,
};

pub type SharedController = Arc<Mutex<FocusController>>;

/// What observers receive after every call into the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    /// Increments on every publish.
    pub version: u64,
    pub session: SessionView,
    /// Whether the break overlay is up.
    pub enforcing: bool,
    pub reminder_pending: bool,
}

/// Everything the controller talks to outside the process.
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub store: Box<dyn SnapshotStore>,
    pub cues: Arc<dyn CuePlayer>,
    pub notifier: Arc<dyn ReminderNotifier>,
    pub presenter: Arc<dyn BreakPresenter>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            store: Box::new(MemoryStore::new()),
            cues: Arc::new(SilentCuePlayer),
            notifier: Arc::new(NullNotifier),
            presenter: Arc::new(NullPresenter),
        }
    }
}

pub struct FocusController {
    engine: SessionEngine,
    policy: StrictPolicy,
    notifications_enabled: bool,
    reminders: ReminderScheduler,
    gesture: EscapeGesture,
    notifier: Arc<dyn ReminderNotifier>,
    presenter: Arc<dyn BreakPresenter>,
    /// Last value handed to the presenter.
    enforcing: Option<bool>,
    version: u64,
    updates: watch::Sender<ControllerSnapshot>,
}

impl FocusController {
    /// Restore the session from the store and take ownership of it.
    ///
    /// The event is the completion cascade run by the restore, if any.
    pub fn restore(config: &Config, collaborators: Collaborators) -> (Self, Option<Event>) {
        let Collaborators {
            clock,
            store,
            cues,
            notifier,
            presenter,
        } = collaborators;
        let (engine, event) = SessionEngine::restore(config.timer_config(), clock, store, cues);
        (Self::from_engine(config, engine, notifier, presenter), event)
    }

    pub fn from_engine(
        config: &Config,
        engine: SessionEngine,
        notifier: Arc<dyn ReminderNotifier>,
        presenter: Arc<dyn BreakPresenter>,
    ) -> Self {
        let session = engine.view();
        let (updates, _) = watch::channel(ControllerSnapshot {
            version: 0,
            session,
            enforcing: false,
            reminder_pending: false,
        });
        let mut controller = Self {
            engine,
            policy: config.strict_policy(),
            notifications_enabled: config.notifications.enabled,
            reminders: ReminderScheduler::new(),
            gesture: config.escape_gesture(),
            notifier,
            presenter,
            enforcing: None,
            version: 0,
            updates,
        };
        controller.refresh();
        controller
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.updates.subscribe()
    }

    pub fn latest(&self) -> ControllerSnapshot {
        self.updates.borrow().clone()
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    pub fn is_enforcing(&self) -> bool {
        self.enforcing.unwrap_or(false)
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub fn gesture(&self) -> &EscapeGesture {
        &self.gesture
    }

    // ── Triggers ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        let event = self.engine.start();
        self.refresh();
        event
    }

    pub fn toggle_play_pause(&mut self) -> Option<Event> {
        let event = self.engine.toggle_play_pause();
        self.refresh();
        event
    }

    pub fn pause(&mut self) -> Option<Event> {
        let event = self.engine.pause();
        self.refresh();
        event
    }

    pub fn resume(&mut self) -> Option<Event> {
        let event = self.engine.resume();
        self.refresh();
        event
    }

    pub fn reset(&mut self) -> Option<Event> {
        let event = self.engine.reset();
        self.refresh();
        event
    }

    pub fn skip(&mut self) -> Option<Event> {
        let event = self.engine.skip();
        self.refresh();
        event
    }

    pub fn start_next_break_now(&mut self) -> Option<Event> {
        let event = self.engine.start_next_break_now();
        self.refresh();
        event
    }

    pub fn extend_current_focus(&mut self, minutes: u64) -> Option<Event> {
        let event = self.engine.extend_current_focus(minutes);
        self.refresh();
        event
    }

    pub fn bypass_strict_mode_for_current_break(&mut self) -> Option<Event> {
        let event = self.engine.bypass_strict_mode_for_current_break();
        self.refresh();
        event
    }

    /// Periodic re-check hint.
    pub fn tick(&mut self) -> Option<Event> {
        self.gesture.expire(Instant::now());
        let event = self.engine.tick();
        self.refresh();
        event
    }

    pub fn handle_reminder_action(&mut self, action: ReminderAction) -> Option<Event> {
        debug!(%action, "reminder action");
        let event = match action {
            ReminderAction::StartNextBreakNow => self.engine.start_next_break_now(),
            ReminderAction::AddOneMinute | ReminderAction::AddFiveMinutes => {
                let minutes = action.extension_minutes().unwrap_or(1);
                let event = self.engine.extend_current_focus(minutes);
                self.reminders.rearm(self.notifier.as_ref());
                event
            }
            ReminderAction::SkipBreak => self.engine.skip(),
        };
        self.refresh();
        event
    }

    pub fn handle_key_press(&mut self, key: KeyPress) -> Option<Event> {
        self.handle_key_press_at(key, Instant::now())
    }

    pub fn handle_key_press_at(&mut self, key: KeyPress, at: Instant) -> Option<Event> {
        let enforcing = should_enforce(self.policy, &self.engine.view());
        match self.gesture.on_key_down_at(key, enforcing, at) {
            GestureOutcome::Skip => {
                debug!(?key, "leaving enforced break");
                let event = self.engine.skip();
                self.refresh();
                event
            }
            GestureOutcome::Armed | GestureOutcome::Ignored => None,
        }
    }

    /// Apply a new configuration. The running phase keeps its deadline.
    pub fn set_config(&mut self, config: &Config) {
        self.engine.set_config(config.timer_config());
        self.policy = config.strict_policy();
        self.notifications_enabled = config.notifications.enabled;
        self.gesture = config.escape_gesture();
        self.refresh();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn refresh(&mut self) {
        let session = self.engine.view();

        let enforcing = should_enforce(self.policy, &session);
        if self.enforcing != Some(enforcing) {
            debug!(enforcing, "break enforcement changed");
            self.presenter.set_blocking(enforcing);
            self.enforcing = Some(enforcing);
        }
        if !enforcing {
            self.gesture.clear();
        }

        self.reminders
            .evaluate(&session, self.notifications_enabled, self.notifier.as_ref());

        self.version += 1;
        self.updates.send_replace(ControllerSnapshot {
            version: self.version,
            session,
            enforcing,
            reminder_pending: self.reminders.pending_id().is_some(),
        });
    }
}
