//! End-to-end session behaviour against a manual clock.

use std::sync::Arc;

use notchfocus_core::integrations::SilentCuePlayer;
use notchfocus_core::{
    Event, ManualClock, MemoryStore, Phase, RunState, SessionEngine, SnapshotStore, TimerConfig,
};
use proptest::prelude::*;

fn engine_with(config: TimerConfig) -> (SessionEngine, Arc<ManualClock>, MemoryStore) {
    let clock = Arc::new(ManualClock::default());
    let store = MemoryStore::new();
    let engine = SessionEngine::new(
        config,
        clock.clone(),
        Box::new(store.clone()),
        Arc::new(SilentCuePlayer),
    );
    (engine, clock, store)
}

#[test]
fn every_fourth_focus_earns_a_long_break() {
    let (mut engine, _, _) = engine_with(TimerConfig::default());
    let mut breaks = Vec::new();
    for _ in 0..12 {
        engine.start();
        engine.skip();
        breaks.push(engine.phase());
        engine.skip();
        assert_eq!(engine.phase(), Phase::Focus);
    }
    for (i, phase) in breaks.iter().enumerate() {
        let count = i + 1;
        let expected = if count % 4 == 0 {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        };
        assert_eq!(*phase, expected, "after focus #{count}");
    }
    assert_eq!(engine.completed_focus_count(), 12);
}

#[test]
fn full_cycle_by_deadlines_alone() {
    let config = TimerConfig::new(1, 1, 2, 2).with_auto_start(true, true);
    let (mut engine, clock, _) = engine_with(config);
    engine.start();

    let mut seen = Vec::new();
    for _ in 0..(4 * 60 + 5) {
        clock.advance_secs(1);
        if let Some(Event::PhaseCompleted { completed, next, .. }) = engine.tick() {
            seen.push((completed, next));
        }
    }
    assert_eq!(
        seen,
        vec![
            (Phase::Focus, Phase::ShortBreak),
            (Phase::ShortBreak, Phase::Focus),
            (Phase::Focus, Phase::LongBreak),
        ]
    );
    assert_eq!(engine.run_state(), RunState::Running);
}

#[test]
fn breaks_wait_for_the_user_without_auto_start() {
    let config = TimerConfig::default().with_auto_start(false, false);
    let (mut engine, clock, _) = engine_with(config);
    engine.start();
    clock.advance_secs(25 * 60);
    let event = engine.tick().unwrap();
    assert!(matches!(
        event,
        Event::PhaseCompleted {
            started_running: false,
            ..
        }
    ));
    assert_eq!(engine.phase(), Phase::ShortBreak);
    assert_eq!(engine.run_state(), RunState::Paused);

    clock.advance_secs(3600);
    assert!(engine.tick().is_none());
    assert_eq!(engine.current_remaining_ms(), 5 * 60 * 1000);
}

#[test]
fn extend_while_paused_adds_to_paused_remaining() {
    let (mut engine, clock, _) = engine_with(TimerConfig::default());
    engine.start();
    clock.advance_secs(5 * 60);
    engine.pause();
    let event = engine.extend_current_focus(5).unwrap();
    assert!(matches!(
        event,
        Event::FocusExtended {
            added_minutes: 5,
            remaining_ms: 1_500_000,
            ..
        }
    ));
    assert!(engine.phase_end().is_none());
    assert_eq!(engine.run_state(), RunState::Paused);
    assert_eq!(engine.paused_remaining_ms(), 25 * 60 * 1000);
}

#[test]
fn pause_then_resume_keeps_remaining_and_count() {
    let (mut engine, clock, _) = engine_with(TimerConfig::default());
    engine.start();
    engine.skip();
    engine.skip();
    engine.start();
    clock.advance_secs(100);
    let before = engine.current_remaining_ms();
    engine.pause();
    engine.resume();
    assert_eq!(engine.current_remaining_ms(), before);
    assert_eq!(engine.completed_focus_count(), 1);
}

#[test]
fn start_mid_break_jumps_back_to_focus() {
    let (mut engine, _, _) = engine_with(TimerConfig::default());
    engine.start();
    engine.skip();
    assert_eq!(engine.phase(), Phase::ShortBreak);
    engine.start();
    assert_eq!(engine.phase(), Phase::Focus);
    assert_eq!(engine.run_state(), RunState::Running);
    assert_eq!(engine.completed_focus_count(), 1);
}

#[test]
fn every_mutation_is_written_through() {
    let (mut engine, clock, store) = engine_with(TimerConfig::default());
    engine.start();
    clock.advance_secs(30);
    engine.pause();
    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.state, RunState::Paused);
    assert_eq!(stored.paused_remaining_seconds, 1470.0);
    assert!(store.raw().unwrap().contains("\"state\":\"paused\""));

    engine.reset();
    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.state, RunState::Idle);
    assert_eq!(stored.completed_focus_sessions, 0);
}

proptest! {
    #[test]
    fn remaining_strictly_decreases_while_running(steps in prop::collection::vec(1i64..120, 1..40)) {
        let (mut engine, clock, _) = engine_with(TimerConfig::default());
        engine.start();
        let mut last = engine.current_remaining_ms();
        for secs in steps {
            clock.advance_secs(secs);
            if engine.tick().is_some() {
                break;
            }
            let now = engine.remaining_ms();
            prop_assert!(now < last);
            prop_assert_eq!(now, engine.current_remaining_ms());
            last = now;
        }
    }

    #[test]
    fn break_kind_follows_cycle(cycle in 1u64..8, focus_count in 1u64..40) {
        let config = TimerConfig::new(25, 5, 15, cycle);
        let expected = if focus_count % cycle == 0 { Phase::LongBreak } else { Phase::ShortBreak };
        prop_assert_eq!(config.break_after(focus_count), expected);
    }
}
