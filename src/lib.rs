//! Voxtris: hands-free voice control for a falling-block puzzle game.
//!
//! A speech recognizer that stops after every utterance is kept listening
//! for the whole game, and whatever it hears is turned into game commands:
//!
//! Recognizer → Session (re-arm, watchdog) → Interpreter → Game
//!
//! # Architecture
//!
//! - **Engine**: the platform recognizer behind [`RecognitionEngine`]
//! - **Session**: lifecycle state machine that re-arms the engine on end of
//!   speech and on a periodic watchdog
//! - **Interpreter**: keyword table plus the started/paused activation state
//! - **Sink**: where commands go, behind [`ActionSink`]
//! - **Controller**: the single task that wires the above together

pub mod command;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod sink;
pub mod stdio;
pub mod voxtris_dirs;

#[cfg(test)]
pub(crate) mod test_utils;

pub use command::{ActivationState, CommandInterpreter, Direction, GameCommand};
pub use config::VoiceConfig;
pub use controller::{SessionControl, SessionReport, VoiceController};
pub use engine::{ErrorKind, ListenOptions, RecognitionEngine, RecognitionEvent};
pub use error::{Result, SessionError, VoiceError};
pub use runtime::VoiceEvent;
pub use session::{SessionManager, SessionState};
pub use sink::ActionSink;
