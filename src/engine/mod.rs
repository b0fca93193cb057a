//! Speech recognition engine boundary.
//!
//! The acoustic-to-text engine is an external capability. The session layer
//! only needs a small control surface ([`RecognitionEngine`]) and a stream of
//! [`RecognitionEvent`]s delivered on an mpsc channel registered through
//! [`RecognitionEngine::set_listener`].
//!
//! Engines are expected to be bursty and unreliable: they stop on their own
//! after every utterance, may stop silently after an idle window, and report
//! transient failures as [`ErrorKind`] codes. Keeping the session alive
//! despite that is the job of [`crate::session::SessionManager`].

pub mod console;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sender half used by an engine to deliver events to the session layer.
pub type EventSender = mpsc::UnboundedSender<RecognitionEvent>;

/// Receiver half consumed by [`crate::controller::VoiceController`].
pub type EventReceiver = mpsc::UnboundedReceiver<RecognitionEvent>;

/// Create the channel an engine uses to deliver [`RecognitionEvent`]s.
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Options passed to the engine on every `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenOptions {
    /// Deliver partial (in-progress) hypotheses.
    pub partial_results: bool,
    /// Prefer on-device recognition where the engine supports it.
    pub prefer_offline: bool,
    /// Upper bound on the number of candidate transcripts per result.
    pub max_candidates: u8,
    /// Identity tag of the calling application.
    pub caller_id: String,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            partial_results: true,
            prefer_offline: true,
            max_candidates: 3,
            caller_id: "voxtris".to_owned(),
        }
    }
}

/// Control surface of a speech recognition engine.
///
/// All methods must return promptly: "listening" is a background activity
/// owned by the engine, never a blocking call on the session task.
pub trait RecognitionEngine: Send {
    /// Whether recognition is available on this device at all.
    fn query_available(&self) -> bool;

    /// Register the channel that receives this engine's events.
    fn set_listener(&mut self, listener: EventSender);

    /// Begin listening with the given options.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the request outright.
    fn start(&mut self, options: &ListenOptions) -> crate::Result<()>;

    /// Request the engine to stop listening. May still deliver one trailing event.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the request outright.
    fn stop(&mut self) -> crate::Result<()>;

    /// Release the engine. No further calls are made afterwards.
    fn destroy(&mut self);
}

/// Asynchronous notification from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// The engine is (or failed to get) ready for speech.
    Ready(bool),
    /// In-progress hypotheses, best-first as ranked by the engine.
    PartialText(Vec<String>),
    /// Final hypotheses with optional confidence scores aligned by index.
    FinalText {
        candidates: Vec<String>,
        scores: Option<Vec<f32>>,
    },
    /// The speaker stopped. The engine auto-stops after this.
    EndOfSpeech,
    /// A mid-session failure.
    Error(ErrorKind),
    /// Outcome of engine preparation. `false` means the capability is missing.
    Prepared(bool),
}

/// Recognition failure codes, numbered like the platform recognizer's.
///
/// None of these is fatal; the next re-arm recovers. A missing capability is
/// reported through [`RecognitionEvent::Prepared`] or `query_available` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkTimeout,
    Network,
    Audio,
    Server,
    Client,
    SpeechTimeout,
    NoMatch,
    RecognizerBusy,
    InsufficientPermissions,
    /// Any code the session layer has no specific classification for.
    Other(i32),
}

impl ErrorKind {
    /// Map a raw engine error code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::NetworkTimeout,
            2 => Self::Network,
            3 => Self::Audio,
            4 => Self::Server,
            5 => Self::Client,
            6 => Self::SpeechTimeout,
            7 => Self::NoMatch,
            8 => Self::RecognizerBusy,
            9 => Self::InsufficientPermissions,
            other => Self::Other(other),
        }
    }

    /// Raw engine error code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::NetworkTimeout => 1,
            Self::Network => 2,
            Self::Audio => 3,
            Self::Server => 4,
            Self::Client => 5,
            Self::SpeechTimeout => 6,
            Self::NoMatch => 7,
            Self::RecognizerBusy => 8,
            Self::InsufficientPermissions => 9,
            Self::Other(code) => code,
        }
    }

    /// Human-readable classification for logs.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Audio => "Audio recording error",
            Self::Client => "Client side error",
            Self::InsufficientPermissions => "Insufficient permissions",
            Self::Network => "Network error",
            Self::NetworkTimeout => "Network timeout",
            Self::NoMatch => "No match",
            Self::RecognizerBusy => "RecognitionService busy",
            Self::Server => "Error from server",
            Self::SpeechTimeout => "No speech input",
            Self::Other(_) => "Didn't understand, please try again.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.description(), self.code())
    }
}
