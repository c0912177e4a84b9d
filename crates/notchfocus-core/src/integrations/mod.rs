//! External collaborators of the session engine.
//!
//! Sound playback, OS notifications and the full-screen break overlay live
//! outside this crate. The engine only sees the traits below, and every
//! implementation must swallow its own failures: a missing sound asset or a
//! denied notification permission never changes timer state.

mod traits;

pub use traits::{
    BreakPresenter, CueId, CuePlayer, NullNotifier, NullPresenter, ReminderNotifier,
    SilentCuePlayer,
};
