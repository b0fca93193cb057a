//! Continuous listening session: lifecycle, liveness timer, counters.

pub mod manager;
pub mod state;
pub mod stats;
pub mod watchdog;

pub use manager::{EventOutcome, SessionManager};
pub use state::{RestartReason, SessionState};
pub use stats::SessionStats;
pub use watchdog::{Watchdog, WatchdogExpired};
