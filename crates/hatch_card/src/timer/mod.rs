//! Sleep timer.
//!
//! A countdown can live in three places, picked once from the configuration:
//! in memory, as a JSON string in an `input_text` helper, or in a host
//! `timer` entity. The tracker polls whichever backend is active, renders the
//! remaining time and runs the expiration actions once per completed
//! countdown.

mod backend;
mod expiration;
pub mod format;
mod tracker;

pub use backend::Countdown;
pub use backend::JsonHelperBackend;
pub use backend::JsonTimerPayload;
pub use backend::LocalBackend;
pub use backend::NativeTimerBackend;
pub use backend::TimerBackend;
pub use expiration::DeferredCall;
pub use expiration::LIGHT_CHANGE_DELAY_MS;
pub use expiration::execute_expiration_actions;
pub use tracker::POLL_INTERVAL_MS;
pub use tracker::TickOutcome;
pub use tracker::TimerError;
pub use tracker::TimerSnapshot;
pub use tracker::TimerTracker;
