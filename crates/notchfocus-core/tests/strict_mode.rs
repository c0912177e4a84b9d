//! Strict-mode enforcement and reminders through the controller.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use notchfocus_core::{
    BreakPresenter, Collaborators, Config, FocusController, KeyPress, ManualClock, MemoryStore,
    Phase, Reminder, ReminderAction, ReminderNotifier, RunState,
};

#[derive(Default)]
struct Overlay {
    blocking: Mutex<bool>,
}

impl BreakPresenter for Overlay {
    fn set_blocking(&self, blocking: bool) {
        *self.blocking.lock().unwrap() = blocking;
    }
}

#[derive(Default)]
struct Notifications {
    visible: Mutex<Vec<String>>,
    posted: Mutex<usize>,
}

impl ReminderNotifier for Notifications {
    fn post(&self, reminder: &Reminder) -> bool {
        self.visible.lock().unwrap().push(reminder.id.clone());
        *self.posted.lock().unwrap() += 1;
        true
    }

    fn withdraw(&self, reminder_id: &str) {
        self.visible.lock().unwrap().retain(|id| id != reminder_id);
    }
}

struct Host {
    controller: FocusController,
    clock: Arc<ManualClock>,
    overlay: Arc<Overlay>,
    notifications: Arc<Notifications>,
}

fn host(config: &Config) -> Host {
    let clock = Arc::new(ManualClock::default());
    let overlay = Arc::new(Overlay::default());
    let notifications = Arc::new(Notifications::default());
    let (controller, _) = FocusController::restore(
        config,
        Collaborators {
            clock: clock.clone(),
            store: Box::new(MemoryStore::new()),
            notifier: notifications.clone(),
            presenter: overlay.clone(),
            ..Collaborators::default()
        },
    );
    Host {
        controller,
        clock,
        overlay,
        notifications,
    }
}

fn strict_config() -> Config {
    let mut config = Config::default();
    config.strict_mode.enabled = true;
    config
}

fn into_break(host: &mut Host) {
    host.controller.start();
    host.clock.advance_secs(25 * 60);
    host.controller.tick();
    assert_eq!(host.controller.engine().phase(), Phase::ShortBreak);
}

#[test]
fn overlay_follows_break_lifecycle() {
    let mut host = host(&strict_config());
    into_break(&mut host);
    assert!(*host.overlay.blocking.lock().unwrap());

    host.clock.advance_secs(5 * 60);
    host.controller.tick();
    assert_eq!(host.controller.engine().phase(), Phase::Focus);
    assert!(!*host.overlay.blocking.lock().unwrap());
}

#[test]
fn paused_break_is_still_enforced() {
    let mut host = host(&strict_config());
    into_break(&mut host);
    host.controller.pause();
    assert!(host.controller.is_enforcing());
    host.controller.reset();
    assert!(!host.controller.is_enforcing());
}

#[test]
fn skip_during_strict_break_ends_enforcement() {
    let mut host = host(&strict_config());
    into_break(&mut host);
    host.controller.skip();
    assert!(!host.controller.is_enforcing());
    assert!(!*host.overlay.blocking.lock().unwrap());
}

#[test]
fn double_escape_boundary() {
    let mut host = host(&strict_config());
    into_break(&mut host);

    let t0 = Instant::now();
    host.controller.handle_key_press_at(KeyPress::Escape, t0);
    assert!(host
        .controller
        .handle_key_press_at(KeyPress::Escape, t0 + Duration::from_millis(700))
        .is_none());
    assert!(host.controller.is_enforcing());

    let t1 = t0 + Duration::from_millis(700);
    let event = host
        .controller
        .handle_key_press_at(KeyPress::Escape, t1 + Duration::from_millis(650));
    assert!(event.is_some());
    assert!(!host.controller.is_enforcing());
    assert_eq!(host.controller.engine().phase(), Phase::Focus);
}

#[test]
fn custom_emergency_binding_exits_on_one_press() {
    let mut config = strict_config();
    config.strict_mode.emergency_exit_binding = "ctrl+alt+b".into();
    let mut host = host(&config);
    into_break(&mut host);

    assert!(host.controller.handle_key_press(KeyPress::EmergencyExit).is_some());
    assert!(!host.controller.is_enforcing());
}

#[test]
fn disabled_feature_never_enforces() {
    let mut config = strict_config();
    config.pomodoro_enabled = false;
    let mut host = host(&config);
    into_break(&mut host);
    assert!(!host.controller.is_enforcing());
    assert!(host.controller.handle_key_press(KeyPress::Escape).is_none());
}

#[test]
fn reminder_lifecycle() {
    let mut host = host(&Config::default());
    host.controller.start();
    host.clock.advance_secs(25 * 60 - 45);
    host.controller.tick();
    assert_eq!(host.notifications.visible.lock().unwrap().len(), 1);

    host.controller.tick();
    assert_eq!(*host.notifications.posted.lock().unwrap(), 1);

    host.controller.pause();
    assert!(host.notifications.visible.lock().unwrap().is_empty());

    host.controller.resume();
    assert_eq!(*host.notifications.posted.lock().unwrap(), 2);

    host.controller
        .handle_reminder_action(ReminderAction::AddFiveMinutes);
    assert!(host.notifications.visible.lock().unwrap().is_empty());
    assert_eq!(
        host.controller.engine().current_remaining_ms(),
        (5 * 60 + 45) * 1000
    );

    host.controller.handle_reminder_action(ReminderAction::SkipBreak);
    assert_eq!(host.controller.engine().phase(), Phase::ShortBreak);
    assert_eq!(host.controller.engine().run_state(), RunState::Running);
    assert!(host.notifications.visible.lock().unwrap().is_empty());
}

#[test]
fn turning_notifications_off_withdraws_reminder() {
    let mut config = Config::default();
    let mut host = host(&config);
    host.controller.start();
    host.clock.advance_secs(25 * 60 - 30);
    host.controller.tick();
    assert_eq!(host.notifications.visible.lock().unwrap().len(), 1);

    config.notifications.enabled = false;
    host.controller.set_config(&config);
    assert!(host.notifications.visible.lock().unwrap().is_empty());
}
