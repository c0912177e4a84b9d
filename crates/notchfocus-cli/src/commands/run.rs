//! Foreground session loop.
//!
//! Owns the tick driver and reads one command per stdin line:
//!
//! - `esc`: escape key (double press leaves an enforced break)
//! - `exit`: the configured emergency-exit hotkey
//! - `toggle`, `skip`, `bypass`, `status`
//! - any reminder action id, e.g. `add-one-minute`
//! - `quit`
//!
//! Any other line counts as an unrelated key press. Events and state changes
//! are printed to stdout as JSON lines.

use std::time::Duration;

use notchfocus_core::storage::Database;
use notchfocus_core::{
    spawn_tick_driver, Config, ControllerSnapshot, Event, FocusController, KeyPress, Phase,
    ReminderAction, RunState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::session::{lock, open_controller, record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Key(KeyPress),
    Toggle,
    Skip,
    Bypass,
    Status,
    Reminder(ReminderAction),
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let input = match line {
        "esc" | "escape" => Input::Key(KeyPress::Escape),
        "exit" => Input::Key(KeyPress::EmergencyExit),
        "toggle" => Input::Toggle,
        "skip" => Input::Skip,
        "bypass" => Input::Bypass,
        "status" => Input::Status,
        "quit" | "q" => Input::Quit,
        other => match other.parse::<ReminderAction>() {
            Ok(action) => Input::Reminder(action),
            Err(_) => Input::Key(KeyPress::Other),
        },
    };
    Some(input)
}

fn apply(controller: &mut FocusController, input: Input) -> Option<Event> {
    match input {
        Input::Key(key) => controller.handle_key_press(key),
        Input::Toggle => controller.toggle_play_pause(),
        Input::Skip => controller.skip(),
        Input::Bypass => controller.bypass_strict_mode_for_current_break(),
        Input::Reminder(action) => controller.handle_reminder_action(action),
        Input::Status | Input::Quit => None,
    }
}

/// The parts of a snapshot worth a line of output; remaining time changes
/// every tick.
fn headline(snapshot: &ControllerSnapshot) -> (Phase, RunState, bool, bool) {
    (
        snapshot.session.phase,
        snapshot.session.run_state,
        snapshot.enforcing,
        snapshot.reminder_pending,
    )
}

fn emit<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("could not print output: {e}"),
    }
}

pub fn run(tick_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_loop(Duration::from_millis(tick_ms)));
    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_background();
    result
}

async fn run_loop(period: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let history = Database::open()?;
    let (controller, restored) = open_controller(&config, true)?;
    if let Some(event) = &restored {
        record(&history, &config, event);
        emit(event);
    }

    let mut updates = controller.subscribe();
    let mut last = {
        let snapshot = updates.borrow_and_update().clone();
        emit(&snapshot);
        headline(&snapshot)
    };

    let shared = controller.into_shared();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let driver = spawn_tick_driver(shared.clone(), period, events_tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                record(&history, &config, &event);
                emit(&event);
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let now = headline(&snapshot);
                if now != last {
                    emit(&snapshot);
                    last = now;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                let Some(input) = parse_input(&line) else {
                    continue;
                };
                if input == Input::Quit {
                    break;
                }
                let (event, snapshot) = {
                    let mut controller = lock(&shared);
                    let event = apply(&mut controller, input);
                    (event, controller.latest())
                };
                if let Some(event) = &event {
                    record(&history, &config, event);
                    emit(event);
                }
                if input == Input::Status {
                    emit(&snapshot);
                }
            }
        }
    }

    driver.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hotkeys_and_reminder_ids() {
        assert_eq!(parse_input("esc"), Some(Input::Key(KeyPress::Escape)));
        assert_eq!(parse_input(" exit "), Some(Input::Key(KeyPress::EmergencyExit)));
        assert_eq!(
            parse_input("add-five-minutes"),
            Some(Input::Reminder(ReminderAction::AddFiveMinutes))
        );
        assert_eq!(parse_input("a"), Some(Input::Key(KeyPress::Other)));
        assert_eq!(parse_input("quit"), Some(Input::Quit));
        assert_eq!(parse_input("   "), None);
    }

    #[test]
    fn status_and_quit_do_not_mutate() {
        let (mut controller, _) =
            FocusController::restore(&Config::default(), Default::default());
        assert!(apply(&mut controller, Input::Status).is_none());
        assert!(apply(&mut controller, Input::Toggle).is_some());
        assert_eq!(controller.engine().run_state(), RunState::Running);
    }
}
