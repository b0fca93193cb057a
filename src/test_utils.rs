//! Shared test doubles for the engine and game sides of the session.

use crate::command::GameCommand;
use crate::engine::{EventSender, ListenOptions, RecognitionEngine, RecognitionEvent};
use crate::error::VoiceError;
use crate::sink::ActionSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One call made on a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    QueryAvailable,
    SetListener,
    Start(ListenOptions),
    Stop,
    Destroy,
}

/// Engine that records every call and lets tests inject events.
///
/// Clones share state, so a test can keep one handle while the session owns another.
#[derive(Clone)]
pub struct RecordingEngine {
    available: bool,
    calls: Arc<Mutex<Vec<EngineCall>>>,
    listener: Arc<Mutex<Option<EventSender>>>,
    fail_start: Arc<AtomicBool>,
    fail_stop: Arc<AtomicBool>,
}

impl RecordingEngine {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            calls: Arc::default(),
            listener: Arc::default(),
            fail_start: Arc::default(),
            fail_stop: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().expect("lock engine calls").clone()
    }

    /// Calls other than `QueryAvailable` / `SetListener`.
    pub fn lifecycle_calls(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, EngineCall::QueryAvailable | EngineCall::SetListener))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().expect("lock engine calls").clear();
    }

    pub fn fail_starts(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Make `stop` record the call and then fail.
    pub fn fail_stops(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    /// Deliver an event through the registered listener.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        let slot = self.listener.lock().expect("lock engine listener");
        slot.as_ref().is_some_and(|tx| tx.send(event).is_ok())
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().expect("lock engine calls").push(call);
    }
}

impl RecognitionEngine for RecordingEngine {
    fn query_available(&self) -> bool {
        self.record(EngineCall::QueryAvailable);
        self.available
    }

    fn set_listener(&mut self, listener: EventSender) {
        self.record(EngineCall::SetListener);
        *self.listener.lock().expect("lock engine listener") = Some(listener);
    }

    fn start(&mut self, options: &ListenOptions) -> crate::Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(VoiceError::Engine("recognizer busy".into()));
        }
        self.record(EngineCall::Start(options.clone()));
        Ok(())
    }

    fn stop(&mut self) -> crate::Result<()> {
        self.record(EngineCall::Stop);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(VoiceError::Engine("stop rejected".into()));
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.record(EngineCall::Destroy);
        self.listener.lock().expect("lock engine listener").take();
    }
}

/// Sink that keeps every dispatched command.
#[derive(Clone, Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<GameCommand>>>,
}

impl RecordingSink {
    pub fn commands(&self) -> Vec<GameCommand> {
        self.commands.lock().expect("lock sink commands").clone()
    }
}

impl ActionSink for RecordingSink {
    fn dispatch(&self, command: GameCommand) {
        self.commands
            .lock()
            .expect("lock sink commands")
            .push(command);
    }
}
