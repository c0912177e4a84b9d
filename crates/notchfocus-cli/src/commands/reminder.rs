use notchfocus_core::storage::Database;
use notchfocus_core::{Config, ReminderAction};

use super::session::{open_controller, print_pretty, record};

/// Apply a reminder action as if it was picked on the notification.
pub fn run(action_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let action: ReminderAction = action_id.parse()?;

    let config = Config::load_or_default();
    let history = Database::open()?;
    let (mut controller, restored) = open_controller(&config, false)?;
    if let Some(event) = &restored {
        record(&history, &config, event);
    }

    match controller.handle_reminder_action(action) {
        Some(event) => {
            record(&history, &config, &event);
            print_pretty(&event)
        }
        None => print_pretty(&controller.engine().snapshot()),
    }
}
