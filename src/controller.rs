//! Session event loop.
//!
//! [`VoiceController`] ties the pieces together on a single task: engine
//! events feed the [`SessionManager`], recognized text feeds the
//! [`CommandInterpreter`], and commands go out through the [`ActionSink`].
//! The watchdog runs on its own task and only sends expiries back in.

use crate::command::{ActivationState, CommandInterpreter};
use crate::config::{CommandSource, SessionSettings, VoiceConfig};
use crate::engine::{RecognitionEngine, RecognitionEvent, event_channel};
use crate::error::Result;
use crate::runtime::{VoiceEvent, VoiceEventSender};
use crate::session::{
    EventOutcome, RestartReason, SessionManager, SessionState, SessionStats, Watchdog,
    WatchdogExpired,
};
use crate::sink::ActionSink;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Requests from the host application (window focus, menu buttons, exit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    /// Resume listening after a [`StopListening`](Self::StopListening).
    StartListening,
    /// Stop listening until told otherwise. The watchdog does not re-arm
    /// a session stopped this way: its expiries are ignored until
    /// `StartListening` or `Restart`, so a host-requested stop sticks even
    /// though the watchdog otherwise re-arms unconditionally.
    StopListening,
    /// Stop + start right now.
    Restart,
    /// End the session and release the engine.
    Shutdown,
}

/// Summary returned when the session loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub stats: SessionStats,
    pub final_state: SessionState,
    pub activation: ActivationState,
}

/// Runs one voice control session from create to destroy.
pub struct VoiceController<E: RecognitionEngine, S: ActionSink> {
    session: SessionManager<E>,
    interpreter: CommandInterpreter,
    sink: S,
    settings: SessionSettings,
    events_tx: Option<VoiceEventSender>,
    control_rx: Option<mpsc::UnboundedReceiver<SessionControl>>,
    cancel: CancellationToken,
    suspended: bool,
}

impl<E: RecognitionEngine, S: ActionSink> VoiceController<E, S> {
    #[must_use]
    pub fn new(engine: E, sink: S, config: &VoiceConfig) -> Self {
        let settings = config.session.settings();
        let session = SessionManager::new(engine, config.recognizer.listen_options())
            .with_rearm_on_end_of_speech(settings.rearm_on_end_of_speech);
        Self {
            session,
            interpreter: CommandInterpreter::new(),
            sink,
            settings,
            events_tx: None,
            control_rx: None,
            cancel: CancellationToken::new(),
            suspended: false,
        }
    }

    /// Publish [`VoiceEvent`]s on `tx`.
    #[must_use]
    pub fn with_events(mut self, tx: VoiceEventSender) -> Self {
        self.session = self.session.with_events(tx.clone());
        self.events_tx = Some(tx);
        self
    }

    /// Accept [`SessionControl`] requests from `rx`.
    #[must_use]
    pub fn with_control(mut self, rx: mpsc::UnboundedReceiver<SessionControl>) -> Self {
        self.control_rx = Some(rx);
        self
    }

    /// Start from a known activation state instead of `{false, false}`.
    #[must_use]
    pub fn with_activation(mut self, state: ActivationState) -> Self {
        self.interpreter = CommandInterpreter::with_state(state);
        self
    }

    /// Token that ends [`run`](Self::run) when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Create the recognizer, start listening and process events until
    /// shutdown, cancellation or a fatal capability loss.
    ///
    /// # Errors
    ///
    /// Returns an error only if the recognizer cannot be created at all.
    /// Engine failures during the session are logged and healed by the
    /// next re-arm.
    pub async fn run(mut self) -> Result<SessionReport> {
        let (engine_tx, mut engine_rx) = event_channel();
        if self.session.create_recognizer(engine_tx)? == SessionState::Unavailable {
            return Ok(self.finish(None).await);
        }

        if let Err(e) = self.session.start_recognition() {
            warn!(error = %e, "initial start failed, waiting for a re-arm");
        }

        let (mut expiry_rx, watchdog) = self.spawn_watchdog();
        let mut control_rx = self.control_rx.take();
        let cancel = self.cancel.clone();

        loop {
            let control_fut = async {
                match &mut control_rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            };
            let expiry_fut = async {
                match &mut expiry_rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                () = cancel.cancelled() => {
                    info!("voice session cancelled");
                    break;
                }
                Some(control) = control_fut => {
                    if self.on_control(control) {
                        break;
                    }
                }
                Some(expired) = expiry_fut => self.on_watchdog(expired),
                event = engine_rx.recv() => {
                    let Some(event) = event else {
                        warn!("engine dropped its listener, ending session");
                        break;
                    };
                    if self.on_engine_event(event) {
                        break;
                    }
                }
            }
        }

        Ok(self.finish(watchdog).await)
    }

    fn spawn_watchdog(
        &self,
    ) -> (
        Option<mpsc::UnboundedReceiver<WatchdogExpired>>,
        Option<(CancellationToken, JoinHandle<()>)>,
    ) {
        if self.settings.watchdog_period.is_zero() {
            debug!("watchdog disabled by configuration");
            return (None, None);
        }
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let token = self.cancel.child_token();
        let watchdog = Watchdog::new(
            expiry_tx,
            token.clone(),
            self.settings.watchdog_period,
            self.settings.watchdog_tick,
        );
        let handle = tokio::spawn(watchdog.run());
        (Some(expiry_rx), Some((token, handle)))
    }

    /// Returns `true` when the loop should exit.
    fn on_control(&mut self, control: SessionControl) -> bool {
        debug!(?control, "session control received");
        let result = match control {
            SessionControl::StartListening => {
                self.suspended = false;
                self.session.start_recognition()
            }
            SessionControl::StopListening => {
                self.suspended = true;
                self.session.stop_recognition()
            }
            SessionControl::Restart => {
                self.suspended = false;
                self.session.restart_recognition(RestartReason::Manual)
            }
            SessionControl::Shutdown => {
                info!("voice session shutdown requested");
                return true;
            }
        };
        if let Err(e) = result {
            warn!(?control, error = %e, "session control failed");
        }
        false
    }

    fn on_watchdog(&mut self, expired: WatchdogExpired) {
        if self.suspended {
            debug!(count = expired.count, "watchdog expired while suspended, ignoring");
            return;
        }
        debug!(count = expired.count, "watchdog forcing re-arm");
        if let Err(e) = self.session.restart_recognition(RestartReason::Watchdog) {
            warn!(error = %e, "watchdog re-arm failed");
        }
    }

    /// Returns `true` when the loop should exit.
    fn on_engine_event(&mut self, event: RecognitionEvent) -> bool {
        match self.session.handle_event(event) {
            EventOutcome::Text {
                candidates,
                is_final,
            } => self.on_text(&candidates, is_final),
            EventOutcome::Absorbed | EventOutcome::Dropped => {}
        }
        self.session.state() == SessionState::Unavailable
    }

    fn on_text(&mut self, candidates: &[String], is_final: bool) {
        let Some(text) = candidates.last() else {
            return;
        };
        self.emit(VoiceEvent::Transcript {
            text: text.clone(),
            is_final,
        });

        let drives = match self.settings.command_source {
            CommandSource::Partial => !is_final,
            CommandSource::Final => is_final,
        };
        if !drives {
            debug!(%text, is_final, "recognition result logged only");
            return;
        }

        let Some(command) = self.interpreter.interpret(candidates) else {
            debug!(%text, "no command");
            return;
        };
        info!(?command, %text, "voice command");
        self.sink.dispatch(command);
        self.session.record_command();
        self.emit(VoiceEvent::Command { command });
    }

    async fn finish(
        mut self,
        watchdog: Option<(CancellationToken, JoinHandle<()>)>,
    ) -> SessionReport {
        if let Some((token, handle)) = watchdog {
            token.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "watchdog task failed");
            }
        }
        self.session.destroy_recognizer();

        let report = SessionReport {
            stats: self.session.stats(),
            final_state: self.session.state(),
            activation: self.interpreter.state(),
        };
        info!(
            starts = report.stats.starts,
            restarts = report.stats.total_restarts(),
            commands = report.stats.commands_dispatched,
            "voice session ended"
        );
        report
    }

    fn emit(&self, event: VoiceEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::command::{Direction, GameCommand};
    use crate::config::ListeningProfile;
    use crate::engine::ErrorKind;
    use crate::test_utils::{EngineCall, RecordingEngine, RecordingSink};
    use std::time::Duration;

    struct Harness {
        engine: RecordingEngine,
        sink: RecordingSink,
        events: mpsc::UnboundedReceiver<VoiceEvent>,
        control: mpsc::UnboundedSender<SessionControl>,
        task: JoinHandle<Result<SessionReport>>,
    }

    impl Harness {
        fn spawn(config: &VoiceConfig, available: bool) -> Self {
            let engine = RecordingEngine::new(available);
            let sink = RecordingSink::default();
            let (events_tx, events) = mpsc::unbounded_channel();
            let (control, control_rx) = mpsc::unbounded_channel();
            let controller = VoiceController::new(engine.clone(), sink.clone(), config)
                .with_events(events_tx)
                .with_control(control_rx);
            let task = tokio::spawn(controller.run());
            Self {
                engine,
                sink,
                events,
                control,
                task,
            }
        }

        async fn wait_for(&mut self, pred: impl Fn(&VoiceEvent) -> bool) -> VoiceEvent {
            loop {
                let event = tokio::time::timeout(Duration::from_secs(60), self.events.recv())
                    .await
                    .expect("timed out waiting for voice event")
                    .expect("event channel closed");
                if pred(&event) {
                    return event;
                }
            }
        }

        async fn wait_listening(&mut self) {
            self.wait_for(|e| {
                matches!(
                    e,
                    VoiceEvent::StateChanged {
                        to: SessionState::Listening,
                        ..
                    }
                )
            })
            .await;
        }

        async fn say(&mut self, text: &str, is_final: bool) {
            let candidates = vec![text.to_owned()];
            let event = if is_final {
                RecognitionEvent::FinalText {
                    candidates,
                    scores: None,
                }
            } else {
                RecognitionEvent::PartialText(candidates)
            };
            assert!(self.engine.emit(event));
            self.wait_for(|e| matches!(e, VoiceEvent::Transcript { .. }))
                .await;
        }

        async fn shutdown(self) -> (SessionReport, RecordingEngine, RecordingSink) {
            self.control.send(SessionControl::Shutdown).unwrap();
            let report = self.task.await.unwrap().unwrap();
            (report, self.engine, self.sink)
        }
    }

    fn default_options() -> crate::engine::ListenOptions {
        VoiceConfig::default().recognizer.listen_options()
    }

    fn keyword_config() -> VoiceConfig {
        let mut config = VoiceConfig::default();
        config.session.profile = ListeningProfile::KeywordTriggered;
        config
    }

    #[tokio::test]
    async fn partial_results_drive_the_game_by_default() {
        let mut h = Harness::spawn(&VoiceConfig::default(), true);
        h.wait_listening().await;

        h.say("ok start", false).await;
        h.say("move left", false).await;
        h.say("rotate", true).await;

        let (report, _engine, sink) = h.shutdown().await;
        assert_eq!(
            sink.commands(),
            vec![GameCommand::Reset, GameCommand::Move(Direction::Left)]
        );
        assert_eq!(report.stats.commands_dispatched, 2);
        assert_eq!(report.stats.transcripts, 3);
        assert!(report.activation.is_started);
    }

    #[tokio::test]
    async fn keyword_profile_uses_final_results() {
        let mut h = Harness::spawn(&keyword_config(), true);
        h.wait_listening().await;

        h.say("start", false).await;
        h.say("start", true).await;

        let (_report, _engine, sink) = h.shutdown().await;
        assert_eq!(sink.commands(), vec![GameCommand::Reset]);
    }

    #[tokio::test]
    async fn commands_are_announced_as_events() {
        let mut h = Harness::spawn(&VoiceConfig::default(), true);
        h.wait_listening().await;

        assert!(
            h.engine
                .emit(RecognitionEvent::PartialText(vec!["start".into()]))
        );
        let event = h
            .wait_for(|e| matches!(e, VoiceEvent::Command { .. }))
            .await;
        assert_eq!(
            event,
            VoiceEvent::Command {
                command: GameCommand::Reset
            }
        );
        h.shutdown().await;
    }

    #[tokio::test]
    async fn unavailable_engine_ends_session_with_one_notice() {
        let mut h = Harness::spawn(&VoiceConfig::default(), false);
        h.wait_for(|e| matches!(e, VoiceEvent::CapabilityUnavailable { .. }))
            .await;

        let report = h.task.await.unwrap().unwrap();
        assert_eq!(report.final_state, SessionState::Destroyed);
        assert_eq!(report.stats.starts, 0);
        assert!(
            !h.engine
                .calls()
                .iter()
                .any(|c| matches!(c, EngineCall::Start(_)))
        );
        while let Ok(event) = h.events.try_recv() {
            assert!(!matches!(event, VoiceEvent::CapabilityUnavailable { .. }));
        }
    }

    #[tokio::test]
    async fn end_of_speech_rearms_listening() {
        let mut h = Harness::spawn(&keyword_config(), true);
        h.wait_listening().await;
        h.engine.clear_calls();

        assert!(h.engine.emit(RecognitionEvent::EndOfSpeech));
        h.wait_for(|e| matches!(e, VoiceEvent::Restarted { .. }))
            .await;

        let (report, engine, _sink) = h.shutdown().await;
        assert_eq!(
            engine.lifecycle_calls(),
            vec![
                EngineCall::Stop,
                EngineCall::Start(default_options()),
                EngineCall::Destroy,
            ]
        );
        assert_eq!(report.stats.end_of_speech_restarts, 1);
    }

    #[tokio::test]
    async fn engine_errors_are_reported_and_not_fatal() {
        let mut h = Harness::spawn(&keyword_config(), true);
        h.wait_listening().await;

        assert!(
            h.engine
                .emit(RecognitionEvent::Error(ErrorKind::NoMatch))
        );
        h.wait_for(|e| matches!(e, VoiceEvent::EngineError { .. }))
            .await;
        h.say("start", true).await;

        let (report, _engine, sink) = h.shutdown().await;
        assert_eq!(report.stats.engine_errors, 1);
        assert_eq!(sink.commands(), vec![GameCommand::Reset]);
    }

    #[tokio::test]
    async fn prepared_false_ends_session() {
        let mut h = Harness::spawn(&keyword_config(), true);
        h.wait_listening().await;

        assert!(h.engine.emit(RecognitionEvent::Prepared(false)));
        let report = h.task.await.unwrap().unwrap();
        assert_eq!(report.final_state, SessionState::Destroyed);
        assert_eq!(h.engine.lifecycle_calls().last(), Some(&EngineCall::Destroy));
    }

    #[tokio::test]
    async fn cancel_token_ends_session() {
        let engine = RecordingEngine::new(true);
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let controller =
            VoiceController::new(engine.clone(), RecordingSink::default(), &keyword_config())
                .with_events(events_tx);
        let cancel = controller.cancel_token();
        let task = tokio::spawn(controller.run());

        while let Some(event) = events.recv().await {
            if matches!(
                event,
                VoiceEvent::StateChanged {
                    to: SessionState::Listening,
                    ..
                }
            ) {
                break;
            }
        }
        cancel.cancel();
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.final_state, SessionState::Destroyed);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_restarts_once_per_period() {
        let mut h = Harness::spawn(&VoiceConfig::default(), true);
        h.wait_listening().await;

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        h.wait_for(|e| {
            matches!(
                e,
                VoiceEvent::Restarted {
                    reason: RestartReason::Watchdog
                }
            )
        })
        .await;
        tokio::time::sleep(Duration::from_millis(9_000)).await;

        let (report, engine, _sink) = h.shutdown().await;
        let options = default_options();
        assert_eq!(
            engine.lifecycle_calls(),
            vec![
                EngineCall::Start(options.clone()),
                EngineCall::Stop,
                EngineCall::Start(options),
                EngineCall::Destroy,
            ]
        );
        assert_eq!(report.stats.watchdog_restarts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_listening_suspends_watchdog() {
        let mut h = Harness::spawn(&VoiceConfig::default(), true);
        h.wait_listening().await;

        h.control.send(SessionControl::StopListening).unwrap();
        h.wait_for(|e| {
            matches!(
                e,
                VoiceEvent::StateChanged {
                    to: SessionState::Stopped,
                    ..
                }
            )
        })
        .await;
        tokio::time::sleep(Duration::from_secs(25)).await;

        h.control.send(SessionControl::StartListening).unwrap();
        h.wait_listening().await;

        let (report, _engine, _sink) = h.shutdown().await;
        assert_eq!(report.stats.watchdog_restarts, 0);
        assert_eq!(report.stats.starts, 2);
        assert_eq!(report.stats.stops, 1);
    }

    #[tokio::test]
    async fn manual_restart_is_counted() {
        let mut h = Harness::spawn(&keyword_config(), true);
        h.wait_listening().await;

        h.control.send(SessionControl::Restart).unwrap();
        h.wait_for(|e| {
            matches!(
                e,
                VoiceEvent::Restarted {
                    reason: RestartReason::Manual
                }
            )
        })
        .await;

        let (report, _engine, _sink) = h.shutdown().await;
        assert_eq!(report.stats.manual_restarts, 1);
    }

    #[tokio::test]
    async fn starts_from_given_activation() {
        let engine = RecordingEngine::new(true);
        let sink = RecordingSink::default();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (control, control_rx) = mpsc::unbounded_channel();
        let controller = VoiceController::new(engine.clone(), sink.clone(), &keyword_config())
            .with_activation(ActivationState {
                is_started: true,
                is_paused: false,
            })
            .with_events(events_tx)
            .with_control(control_rx);
        let task = tokio::spawn(controller.run());

        while let Some(event) = events.recv().await {
            if matches!(event, VoiceEvent::StateChanged { to: SessionState::Listening, .. }) {
                break;
            }
        }
        assert!(engine.emit(RecognitionEvent::FinalText {
            candidates: vec!["rotate".into()],
            scores: None,
        }));
        while let Some(event) = events.recv().await {
            if matches!(event, VoiceEvent::Command { .. }) {
                break;
            }
        }
        control.send(SessionControl::Shutdown).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(sink.commands(), vec![GameCommand::Rotate]);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_expiry_right_after_end_of_speech_keeps_listening() {
        let mut h = Harness::spawn(&VoiceConfig::default(), true);
        h.wait_listening().await;

        tokio::time::sleep(Duration::from_millis(9_900)).await;
        assert!(h.engine.emit(RecognitionEvent::EndOfSpeech));
        h.wait_for(|e| {
            matches!(
                e,
                VoiceEvent::Restarted {
                    reason: RestartReason::EndOfSpeech
                }
            )
        })
        .await;

        tokio::time::sleep(Duration::from_millis(600)).await;
        let mut last_state = None;
        loop {
            let event = h.wait_for(|_| true).await;
            match event {
                VoiceEvent::StateChanged { to, .. } => last_state = Some(to),
                VoiceEvent::Restarted {
                    reason: RestartReason::Watchdog,
                } => break,
                _ => {}
            }
        }
        assert_eq!(last_state, Some(SessionState::Listening));

        let (report, _engine, _sink) = h.shutdown().await;
        assert_eq!(report.stats.end_of_speech_restarts, 1);
        assert_eq!(report.stats.watchdog_restarts, 1);
        assert_eq!(report.stats.starts, 3);
    }

    #[tokio::test]
    async fn failed_stop_does_not_end_listening() {
        let mut h = Harness::spawn(&keyword_config(), true);
        h.wait_listening().await;
        h.engine.fail_stops(true);
        h.engine.clear_calls();

        assert!(h.engine.emit(RecognitionEvent::EndOfSpeech));
        h.wait_for(|e| matches!(e, VoiceEvent::Restarted { .. }))
            .await;
        h.say("start", true).await;

        let (report, engine, sink) = h.shutdown().await;
        assert_eq!(
            engine.lifecycle_calls(),
            vec![
                EngineCall::Stop,
                EngineCall::Start(default_options()),
                EngineCall::Destroy,
            ]
        );
        assert_eq!(report.stats.end_of_speech_restarts, 1);
        assert_eq!(sink.commands(), vec![GameCommand::Reset]);
    }

    #[tokio::test]
    async fn final_result_after_end_of_speech_without_rearm_is_dispatched() {
        let mut config = keyword_config();
        config.session.rearm_on_end_of_speech = Some(false);
        let mut h = Harness::spawn(&config, true);
        h.wait_listening().await;

        assert!(h.engine.emit(RecognitionEvent::EndOfSpeech));
        h.wait_for(|e| {
            matches!(
                e,
                VoiceEvent::StateChanged {
                    to: SessionState::Stopped,
                    ..
                }
            )
        })
        .await;
        assert!(h.engine.emit(RecognitionEvent::FinalText {
            candidates: vec!["start".into()],
            scores: None,
        }));
        h.wait_for(|e| matches!(e, VoiceEvent::Command { .. }))
            .await;

        let (report, _engine, sink) = h.shutdown().await;
        assert_eq!(sink.commands(), vec![GameCommand::Reset]);
        assert_eq!(report.stats.end_of_speech_restarts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keyword_profile_watchdog_recovers_after_speech_timeout() {
        let mut h = Harness::spawn(&keyword_config(), true);
        h.wait_listening().await;

        assert!(
            h.engine
                .emit(RecognitionEvent::Error(ErrorKind::SpeechTimeout))
        );
        h.wait_for(|e| matches!(e, VoiceEvent::EngineError { .. }))
            .await;
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        h.wait_for(|e| {
            matches!(
                e,
                VoiceEvent::Restarted {
                    reason: RestartReason::Watchdog
                }
            )
        })
        .await;

        let (report, _engine, _sink) = h.shutdown().await;
        assert_eq!(report.stats.watchdog_restarts, 1);
        assert_eq!(report.stats.starts, 2);
    }
}
