//! Session lifecycle states and restart reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the listening session.
///
/// ```text
/// Uninitialized --create(unavailable)--> Unavailable
/// Uninitialized --create(ok)--> Ready --start--> Listening
/// Listening --(end of speech | watchdog)--> Listening   (stop + start)
/// Listening --stop--> Stopped --start--> Listening
/// any --destroy--> Destroyed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Ready,
    Listening,
    Stopped,
    /// Recognition is missing on this device. Terminal apart from destroy.
    Unavailable,
    /// The engine handle was released. Terminal.
    Destroyed,
}

impl SessionState {
    /// Whether start/stop/restart are accepted in this state.
    #[must_use]
    pub fn accepts_lifecycle_calls(self) -> bool {
        matches!(self, Self::Ready | Self::Stopped | Self::Listening)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Listening => "listening",
            Self::Stopped => "stopped",
            Self::Unavailable => "unavailable",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Why a stop + start cycle was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    /// The engine auto-stopped after an utterance.
    EndOfSpeech,
    /// The liveness timer expired.
    Watchdog,
    /// Requested explicitly by the owner of the session.
    Manual,
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EndOfSpeech => "end_of_speech",
            Self::Watchdog => "watchdog",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}
