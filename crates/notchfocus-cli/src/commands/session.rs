//! Shared plumbing for commands that touch the session.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use notchfocus_core::integrations::{BreakPresenter, CueId, CuePlayer, ReminderNotifier};
use notchfocus_core::storage::Database;
use notchfocus_core::{Collaborators, Config, Event, FocusController, Reminder};
use tracing::{debug, info, warn};

/// Terminal bell for every cue.
pub struct BellCuePlayer;

impl CuePlayer for BellCuePlayer {
    fn play(&self, cue: &CueId) -> bool {
        let mut stderr = std::io::stderr();
        let played = stderr.write_all(b"\x07").and_then(|_| stderr.flush()).is_ok();
        debug!(%cue, played, "cue");
        played
    }
}

/// Reminders as log lines, optionally echoed to stdout as JSON.
pub struct LogNotifier {
    pub echo: bool,
}

impl ReminderNotifier for LogNotifier {
    fn post(&self, reminder: &Reminder) -> bool {
        info!(id = %reminder.id, "{}: {}", reminder.title, reminder.body);
        if !self.echo {
            return false;
        }
        match serde_json::to_string(&serde_json::json!({ "type": "Reminder", "reminder": reminder })) {
            Ok(line) => {
                println!("{line}");
                true
            }
            Err(e) => {
                warn!("could not print reminder: {e}");
                false
            }
        }
    }

    fn withdraw(&self, reminder_id: &str) {
        info!(id = %reminder_id, "reminder withdrawn");
    }
}

/// The terminal has no overlay; the state change is only logged.
pub struct LogPresenter;

impl BreakPresenter for LogPresenter {
    fn set_blocking(&self, blocking: bool) {
        info!(blocking, "break overlay");
    }
}

/// Restore the session from the data directory.
///
/// Returns the controller together with the completion the restore ran, if
/// any.
pub fn open_controller(
    config: &Config,
    echo_reminders: bool,
) -> Result<(FocusController, Option<Event>), Box<dyn std::error::Error>> {
    let store = Database::open()?;
    Ok(FocusController::restore(
        config,
        Collaborators {
            store: Box::new(store),
            cues: Arc::new(BellCuePlayer),
            notifier: Arc::new(LogNotifier {
                echo: echo_reminders,
            }),
            presenter: Arc::new(LogPresenter),
            ..Collaborators::default()
        },
    ))
}

/// Append a finished phase to the history. Failures are logged only.
pub fn record(history: &Database, config: &Config, event: &Event) {
    if let Event::PhaseCompleted {
        completed,
        skipped,
        at,
        ..
    } = event
    {
        let planned_min = config.timer_config().minutes(*completed);
        if let Err(e) = history.record_phase(*completed, planned_min, *skipped, *at) {
            warn!("failed to record phase: {e}");
        }
    }
}

pub fn lock(controller: &Mutex<FocusController>) -> MutexGuard<'_, FocusController> {
    controller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn print_pretty<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
