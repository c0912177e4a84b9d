use clap::Subcommand;
use notchfocus_core::storage::Database;
use notchfocus_core::Config;

use super::session::{open_controller, print_pretty, record};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a focus phase now
    Start,
    /// Start, pause or resume depending on the current state
    Toggle,
    /// Pause the running phase
    Pause,
    /// Resume the paused phase
    Resume,
    /// Back to an idle focus phase with a zero focus count
    Reset,
    /// End the current phase now
    Skip,
    /// End the current focus phase and start its break
    NextBreak,
    /// Add minutes to the current focus phase
    Extend {
        #[arg(default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=240))]
        minutes: u64,
    },
    /// Ignore strict mode for the rest of the current break
    Bypass,
    /// Print the current state as JSON
    Status,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let history = Database::open()?;
    let (mut controller, restored) = open_controller(&config, false)?;
    if let Some(event) = &restored {
        record(&history, &config, event);
    }

    let event = match action {
        TimerAction::Start => controller.start(),
        TimerAction::Toggle => controller.toggle_play_pause(),
        TimerAction::Pause => controller.pause(),
        TimerAction::Resume => controller.resume(),
        TimerAction::Reset => controller.reset(),
        TimerAction::Skip => controller.skip(),
        TimerAction::NextBreak => controller.start_next_break_now(),
        TimerAction::Extend { minutes } => controller.extend_current_focus(minutes),
        TimerAction::Bypass => controller.bypass_strict_mode_for_current_break(),
        TimerAction::Status => {
            let completed = controller.tick();
            if let Some(event) = &completed {
                record(&history, &config, event);
            }
            return print_pretty(&controller.latest());
        }
    };

    match event {
        Some(event) => {
            record(&history, &config, &event);
            print_pretty(&event)
        }
        None => print_pretty(&controller.engine().snapshot()),
    }
}
