//! Events published by the voice session for the UI and observability.
//!
//! Kept lightweight so the session loop can emit them without blocking on
//! the consumer.

use crate::command::GameCommand;
use crate::engine::ErrorKind;
use crate::session::{RestartReason, SessionState};
use serde::Serialize;
use tokio::sync::mpsc;

/// Title of the one-time notice shown when recognition is missing.
pub const UNAVAILABLE_TITLE: &str = "Speech Recognizer unavailable";
/// Body of the one-time notice shown when recognition is missing.
pub const UNAVAILABLE_MESSAGE: &str = "Your device does not support Speech Recognition. Sorry!";

/// What the voice session is doing "right now".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// The session moved to a new lifecycle state.
    StateChanged { from: SessionState, to: SessionState },
    /// Text heard by the engine while listening.
    Transcript { text: String, is_final: bool },
    /// A command was dispatched to the game.
    Command { command: GameCommand },
    /// A recoverable engine failure. Not meant for the user.
    EngineError { kind: ErrorKind, description: String },
    /// The listening session was torn down and re-armed.
    Restarted { reason: RestartReason },
    /// Recognition is not available on this device. Emitted at most once;
    /// the UI should show a blocking acknowledgement.
    CapabilityUnavailable { title: String, message: String },
}

impl VoiceEvent {
    pub(crate) fn capability_unavailable() -> Self {
        Self::CapabilityUnavailable {
            title: UNAVAILABLE_TITLE.to_owned(),
            message: UNAVAILABLE_MESSAGE.to_owned(),
        }
    }
}

/// Sender for [`VoiceEvent`]s.
pub type VoiceEventSender = mpsc::UnboundedSender<VoiceEvent>;
