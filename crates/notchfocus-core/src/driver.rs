//! Periodic tick driver.
//!
//! Ticks are hints: the engine recomputes remaining time from its deadline,
//! so a delayed or missed tick only delays when a completion is noticed.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::controller::SharedController;
use crate::events::Event;

/// Tick the controller every `period` and forward the resulting events.
///
/// The task ends when the receiving side of `events` is dropped.
pub fn spawn_tick_driver(
    controller: SharedController,
    period: Duration,
    events: UnboundedSender<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if events.is_closed() {
                break;
            }
            let event = {
                let mut guard = match controller.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => {
                        warn!("controller lock poisoned, recovering");
                        poisoned.into_inner()
                    }
                };
                guard.tick()
            };
            if let Some(event) = event {
                if events.send(event).is_err() {
                    break;
                }
            }
        }
        debug!("tick driver stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::controller::{Collaborators, FocusController};
    use crate::storage::Config;
    use crate::timer::Phase;

    #[tokio::test(start_paused = true)]
    async fn forwards_completion_from_tick() {
        let clock = Arc::new(ManualClock::default());
        let (mut controller, _) = FocusController::restore(
            &Config::default(),
            Collaborators {
                clock: clock.clone(),
                ..Collaborators::default()
            },
        );
        controller.start();
        let shared = controller.into_shared();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = spawn_tick_driver(shared.clone(), Duration::from_secs(1), tx);

        clock.advance_secs(25 * 60);
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            Event::PhaseCompleted {
                completed: Phase::Focus,
                next: Phase::ShortBreak,
                ..
            }
        ));
        assert_eq!(shared.lock().unwrap().engine().phase(), Phase::ShortBreak);

        drop(rx);
        handle.await.unwrap();
    }
}
