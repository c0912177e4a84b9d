pub mod completions;
pub mod config;
pub mod reminder;
pub mod run;
pub mod session;
pub mod stats;
pub mod timer;
