use crate::session::RestartReason;
use serde::{Deserialize, Serialize};

/// Counters accumulated over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Engine `start` calls actually issued.
    pub starts: u64,
    /// Engine `stop` calls actually issued.
    pub stops: u64,
    pub end_of_speech_restarts: u64,
    pub watchdog_restarts: u64,
    pub manual_restarts: u64,
    pub engine_errors: u64,
    /// Text events routed to the interpreter.
    pub transcripts: u64,
    pub commands_dispatched: u64,
}

impl SessionStats {
    pub(crate) fn record_restart(&mut self, reason: RestartReason) {
        match reason {
            RestartReason::EndOfSpeech => self.end_of_speech_restarts += 1,
            RestartReason::Watchdog => self.watchdog_restarts += 1,
            RestartReason::Manual => self.manual_restarts += 1,
        }
    }

    #[must_use]
    pub fn total_restarts(&self) -> u64 {
        self.end_of_speech_restarts + self.watchdog_restarts + self.manual_restarts
    }
}
