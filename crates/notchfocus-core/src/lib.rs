//! # NotchFocus Core Library
//!
//! Focus/break session engine behind the notch utility. The host app (and the
//! `notchfocus` CLI) are thin shells over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: deadline-based session state machine, strict-mode enforcement
//!   and the "almost done" reminder
//! - **Storage**: TOML configuration, the persisted session snapshot and a
//!   SQLite phase history
//! - **Controller**: single owner that serializes every trigger and publishes
//!   a consistent snapshot to observers
//! - **Integrations**: traits for sound cues, notifications and the break
//!   overlay, implemented by the host
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: the state machine
//! - [`FocusController`]: serialized owner of the engine
//! - [`Config`]: application configuration
//! - [`Database`]: snapshot store and phase history

pub mod clock;
pub mod controller;
pub mod driver;
pub mod error;
pub mod events;
pub mod integrations;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Collaborators, ControllerSnapshot, FocusController, SharedController};
pub use driver::spawn_tick_driver;
pub use error::{ConfigError, CoreError, PersistError};
pub use events::Event;
pub use integrations::{BreakPresenter, CueId, CuePlayer, ReminderNotifier};
pub use storage::{Config, Database, MemoryStore, PersistedSession, SnapshotStore};
pub use timer::{
    EscapeGesture, KeyPress, Phase, Reminder, ReminderAction, ReminderScheduler, RunState,
    SessionEngine, SessionView, StrictPolicy, TimerConfig,
};
