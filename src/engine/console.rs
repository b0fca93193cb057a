//! Line-driven engine for the console harness.
//!
//! [`ConsoleEngine`] behaves like a real recognizer from the session's point
//! of view: it only emits text while listening, and it stops on its own after
//! every utterance. Lines are fed in through a [`ConsoleFeed`] handle, which
//! can live on a different task than the engine itself.
//!
//! # Line format
//!
//! | Line | Events |
//! |------|--------|
//! | `turn left` | `PartialText`, `FinalText`, `EndOfSpeech` |
//! | `go right \| go write` | same, with two candidates |
//! | `!end` | `EndOfSpeech` |
//! | `!error 7` | `Error(NoMatch)` |
//! | `!unavailable` | `Prepared(false)` |

use crate::engine::{ErrorKind, EventSender, ListenOptions, RecognitionEngine, RecognitionEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// State shared between the engine and its feed handle.
#[derive(Default)]
struct Shared {
    listener: Mutex<Option<EventSender>>,
    listening: AtomicBool,
}

/// Recognition engine whose "audio" is lines of text.
pub struct ConsoleEngine {
    shared: Arc<Shared>,
    available: bool,
}

/// Handle that turns input lines into engine events.
#[derive(Clone)]
pub struct ConsoleFeed {
    shared: Arc<Shared>,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleLine {
    /// An utterance with one or more candidate transcripts.
    Utterance(Vec<String>),
    /// Explicit end of speech.
    EndOfSpeech,
    /// A raw engine error code.
    Error(i32),
    /// Report the capability as missing.
    Unavailable,
}

impl ConsoleEngine {
    /// Create an engine and the feed that drives it.
    #[must_use]
    pub fn new(available: bool) -> (Self, ConsoleFeed) {
        let shared = Arc::new(Shared::default());
        let feed = ConsoleFeed {
            shared: Arc::clone(&shared),
        };
        (Self { shared, available }, feed)
    }
}

impl RecognitionEngine for ConsoleEngine {
    fn query_available(&self) -> bool {
        self.available
    }

    fn set_listener(&mut self, listener: EventSender) {
        if let Ok(mut slot) = self.shared.listener.lock() {
            *slot = Some(listener);
        }
    }

    fn start(&mut self, options: &ListenOptions) -> crate::Result<()> {
        debug!(
            partial_results = options.partial_results,
            max_candidates = options.max_candidates,
            "console engine listening"
        );
        self.shared.listening.store(true, Ordering::SeqCst);
        self.shared.emit(RecognitionEvent::Ready(true));
        Ok(())
    }

    fn stop(&mut self) -> crate::Result<()> {
        self.shared.listening.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(&mut self) {
        self.shared.listening.store(false, Ordering::SeqCst);
        if let Ok(mut slot) = self.shared.listener.lock() {
            slot.take();
        }
        info!("console engine destroyed");
    }
}

impl Shared {
    fn emit(&self, event: RecognitionEvent) -> bool {
        let Ok(slot) = self.listener.lock() else {
            return false;
        };
        match slot.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl ConsoleFeed {
    /// Feed one input line. Returns `false` once the engine's listener is gone.
    pub fn push_line(&self, line: &str) -> bool {
        let Some(parsed) = parse_line(line) else {
            return true;
        };

        match parsed {
            ConsoleLine::Utterance(candidates) => {
                if !self.shared.listening.load(Ordering::SeqCst) {
                    debug!(?candidates, "console engine not listening, utterance dropped");
                    return self.shared.listener.lock().is_ok_and(|s| s.is_some());
                }
                let final_event = RecognitionEvent::FinalText {
                    candidates: candidates.clone(),
                    scores: None,
                };
                // The engine auto-stops once the speaker is done.
                self.shared.listening.store(false, Ordering::SeqCst);
                self.shared.emit(RecognitionEvent::PartialText(candidates))
                    && self.shared.emit(RecognitionEvent::EndOfSpeech)
                    && self.shared.emit(final_event)
            }
            ConsoleLine::EndOfSpeech => {
                self.shared.listening.store(false, Ordering::SeqCst);
                self.shared.emit(RecognitionEvent::EndOfSpeech)
            }
            ConsoleLine::Error(code) => {
                self.shared.emit(RecognitionEvent::Error(ErrorKind::from_code(code)))
            }
            ConsoleLine::Unavailable => self.shared.emit(RecognitionEvent::Prepared(false)),
        }
    }
}

/// Parse a console line. Blank lines yield `None`.
#[must_use]
pub fn parse_line(line: &str) -> Option<ConsoleLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(directive) = line.strip_prefix('!') {
        let mut parts = directive.split_whitespace();
        return match parts.next() {
            Some("end") => Some(ConsoleLine::EndOfSpeech),
            Some("unavailable") => Some(ConsoleLine::Unavailable),
            Some("error") => {
                let code = parts.next().and_then(|c| c.parse().ok()).unwrap_or(0);
                Some(ConsoleLine::Error(code))
            }
            other => {
                warn!(directive = ?other, "unknown console directive");
                None
            }
        };
    }

    let candidates: Vec<String> = line
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(ConsoleLine::Utterance(candidates))
    }
}
