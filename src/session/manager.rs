//! Listening session lifecycle.
//!
//! [`SessionManager`] keeps one logical listening session alive on top of an
//! engine that stops by itself after every utterance. It owns the
//! [`SessionState`] and is the only thing that calls the engine's
//! start/stop/destroy.
//!
//! # Restart discipline
//!
//! Both re-arm paths, end-of-speech and the watchdog, go through
//! [`SessionManager::restart_recognition`], which is a plain stop followed by a
//! start. Start is a no-op while listening and stop is a no-op while stopped,
//! so restarts may interleave in any order without first proving the engine
//! actually stopped.

use crate::engine::{EventSender, ListenOptions, RecognitionEngine, RecognitionEvent};
use crate::error::{Result, SessionError};
use crate::runtime::{VoiceEvent, VoiceEventSender};
use crate::session::{RestartReason, SessionState, SessionStats};
use tracing::{debug, error, info, warn};

/// What the session did with an engine event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Recognized text that should reach the interpreter.
    Text {
        candidates: Vec<String>,
        is_final: bool,
    },
    /// Lifecycle or error event handled inside the session.
    Absorbed,
    /// Event ignored because the session is not listening.
    Dropped,
}

/// Owns the recognition engine and its lifecycle.
pub struct SessionManager<E: RecognitionEngine> {
    engine: E,
    state: SessionState,
    options: ListenOptions,
    rearm_on_end_of_speech: bool,
    events_tx: Option<VoiceEventSender>,
    notice_sent: bool,
    /// The engine auto-stopped after speech and still owes its final result.
    awaiting_final: bool,
    stats: SessionStats,
}

impl<E: RecognitionEngine> SessionManager<E> {
    #[must_use]
    pub fn new(engine: E, options: ListenOptions) -> Self {
        Self {
            engine,
            state: SessionState::Uninitialized,
            options,
            rearm_on_end_of_speech: true,
            events_tx: None,
            notice_sent: false,
            awaiting_final: false,
            stats: SessionStats::default(),
        }
    }

    /// Publish lifecycle events on `tx`.
    #[must_use]
    pub fn with_events(mut self, tx: VoiceEventSender) -> Self {
        self.events_tx = Some(tx);
        self
    }

    /// Whether an end-of-speech event re-arms the engine immediately.
    #[must_use]
    pub fn with_rearm_on_end_of_speech(mut self, rearm: bool) -> Self {
        self.rearm_on_end_of_speech = rearm;
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    #[must_use]
    pub fn options(&self) -> &ListenOptions {
        &self.options
    }

    /// Query capability once and register `listener` for engine events.
    ///
    /// A missing capability moves the session to [`SessionState::Unavailable`]
    /// and publishes the one user-facing notice. That is not retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the recognizer was already created or destroyed.
    pub fn create_recognizer(&mut self, listener: EventSender) -> Result<SessionState> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Destroyed => return Err(SessionError::Destroyed.into()),
            _ => return Err(SessionError::AlreadyCreated.into()),
        }

        if !self.engine.query_available() {
            self.mark_unavailable();
            return Ok(self.state);
        }

        self.engine.set_listener(listener);
        self.transition(SessionState::Ready);
        Ok(self.state)
    }

    /// Ask the engine to listen. A no-op while already listening.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot start from its current state or
    /// the engine rejects the request.
    pub fn start_recognition(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.state == SessionState::Listening {
            debug!("start requested while listening, ignoring");
            return Ok(());
        }

        self.engine.start(&self.options)?;
        self.awaiting_final = false;
        self.stats.starts += 1;
        self.transition(SessionState::Listening);
        Ok(())
    }

    /// Ask the engine to stop. A no-op while already stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot stop from its current state or
    /// the engine rejects the request. The session is `Stopped` either way.
    pub fn stop_recognition(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.awaiting_final = false;
        match self.state {
            SessionState::Listening => {
                let result = self.engine.stop();
                self.stats.stops += 1;
                self.transition(SessionState::Stopped);
                result
            }
            SessionState::Ready => {
                self.transition(SessionState::Stopped);
                Ok(())
            }
            _ => {
                debug!("stop requested while stopped, ignoring");
                Ok(())
            }
        }
    }

    /// Stop immediately followed by start.
    ///
    /// A failed stop does not prevent the start: the session is `Stopped`
    /// after any stop attempt, so the start is always issued.
    ///
    /// # Errors
    ///
    /// Returns the start error if the engine rejects the start, otherwise the
    /// stop error if the engine rejected the stop.
    pub fn restart_recognition(&mut self, reason: RestartReason) -> Result<()> {
        self.ensure_usable()?;
        let stopped = self.stop_recognition();
        if let Err(e) = &stopped {
            warn!(%reason, error = %e, "engine stop failed during re-arm, starting anyway");
        }
        self.start_recognition()?;
        self.stats.record_restart(reason);
        debug!(%reason, "listening session re-armed");
        self.emit(VoiceEvent::Restarted { reason });
        stopped
    }

    /// Release the engine. Valid from any state; later calls are no-ops.
    pub fn destroy_recognizer(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.engine.destroy();
        self.transition(SessionState::Destroyed);
    }

    /// Apply one engine event to the session.
    pub fn handle_event(&mut self, event: RecognitionEvent) -> EventOutcome {
        match event {
            RecognitionEvent::Ready(ok) => {
                if ok {
                    debug!("engine ready for speech");
                } else {
                    warn!("engine reported it is not ready for speech");
                }
                EventOutcome::Absorbed
            }
            RecognitionEvent::Prepared(true) => {
                info!("speech recognizer prepared");
                EventOutcome::Absorbed
            }
            RecognitionEvent::Prepared(false) => {
                self.mark_unavailable();
                EventOutcome::Absorbed
            }
            RecognitionEvent::Error(kind) => {
                self.stats.engine_errors += 1;
                warn!(
                    code = kind.code(),
                    description = kind.description(),
                    "recognition error, waiting for next re-arm"
                );
                self.emit(VoiceEvent::EngineError {
                    kind,
                    description: kind.description().to_owned(),
                });
                EventOutcome::Absorbed
            }
            RecognitionEvent::EndOfSpeech => {
                self.on_end_of_speech();
                EventOutcome::Absorbed
            }
            RecognitionEvent::PartialText(candidates) => self.route_text(candidates, false),
            RecognitionEvent::FinalText { candidates, scores } => {
                if let Some(scores) = &scores {
                    debug!(?candidates, ?scores, "final recognition result");
                }
                self.route_text(candidates, true)
            }
        }
    }

    pub(crate) fn record_command(&mut self) {
        self.stats.commands_dispatched += 1;
    }

    fn on_end_of_speech(&mut self) {
        if self.state != SessionState::Listening {
            debug!(state = %self.state, "end of speech outside listening, ignoring");
            return;
        }

        if !self.rearm_on_end_of_speech {
            // The engine has already stopped itself.
            self.transition(SessionState::Stopped);
            self.awaiting_final = true;
            return;
        }

        if let Err(e) = self.restart_recognition(RestartReason::EndOfSpeech) {
            warn!(error = %e, "re-arm after end of speech reported an error");
        }
    }

    fn route_text(&mut self, candidates: Vec<String>, is_final: bool) -> EventOutcome {
        let owed_final = is_final && self.awaiting_final && self.state == SessionState::Stopped;
        if self.state != SessionState::Listening && !owed_final {
            debug!(state = %self.state, is_final, "dropping text event outside listening");
            return EventOutcome::Dropped;
        }
        if owed_final {
            self.awaiting_final = false;
        }
        if candidates.is_empty() {
            return EventOutcome::Dropped;
        }
        self.stats.transcripts += 1;
        EventOutcome::Text {
            candidates,
            is_final,
        }
    }

    fn mark_unavailable(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.transition(SessionState::Unavailable);
        if !self.notice_sent {
            self.notice_sent = true;
            error!("speech recognition is not available on this device");
            self.emit(VoiceEvent::capability_unavailable());
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state.accepts_lifecycle_calls() {
            return Ok(());
        }
        let rejection = match self.state {
            SessionState::Uninitialized => SessionError::NotInitialized,
            SessionState::Destroyed => SessionError::Destroyed,
            _ => SessionError::Unavailable,
        };
        Err(rejection.into())
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!(%from, %to, "session state changed");
        self.emit(VoiceEvent::StateChanged { from, to });
    }

    fn emit(&self, event: VoiceEvent) {
        if let Some(tx) = &self.events_tx {
            // Nobody listening is fine; the session keeps running.
            let _ = tx.send(event);
        }
    }
}
