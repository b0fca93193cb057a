//! Stdin/stdout harness around a [`ConsoleEngine`].
//!
//! Stdin lines are fed to the engine as utterances or directives (see
//! [`crate::engine::console`]). Every [`VoiceEvent`] is written to stdout as
//! one JSON line. Stdout is reserved for that stream; diagnostics go to
//! stderr through `tracing`.
//!
//! Besides the engine directives, the reader understands session controls:
//!
//! | Line | Effect |
//! |------|--------|
//! | `!stop` | [`SessionControl::StopListening`] |
//! | `!start` | [`SessionControl::StartListening`] |
//! | `!restart` | [`SessionControl::Restart`] |
//! | `!quit` or EOF | [`SessionControl::Shutdown`] |

use crate::command::GameCommand;
use crate::config::VoiceConfig;
use crate::controller::{SessionControl, SessionReport, VoiceController};
use crate::engine::console::{ConsoleEngine, ConsoleFeed};
use crate::error::{Result, VoiceError};
use crate::runtime::VoiceEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;

/// Run one console session until stdin closes or the session ends.
///
/// `available` is what the console engine reports for capability, so the
/// unavailable path can be exercised by hand.
///
/// # Errors
///
/// Returns an error if the session task fails or stdin cannot be read.
pub async fn run_stdio_session(config: &VoiceConfig, available: bool) -> Result<SessionReport> {
    let (engine, feed) = ConsoleEngine::new(available);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    let controller = VoiceController::new(engine, command_tx, config)
        .with_events(events_tx)
        .with_control(control_rx);

    let forwarder = tokio::spawn(forward_events(events_rx, BufWriter::new(tokio::io::stdout())));
    let game = tokio::spawn(log_game_commands(command_rx));
    let mut session = tokio::spawn(controller.run());

    let reader = run_reader(BufReader::new(tokio::io::stdin()), feed, control_tx);
    tokio::pin!(reader);

    let finished_first = tokio::select! {
        joined = &mut session => Some(joined),
        result = &mut reader => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "console reader failed, shutting down");
            }
            None
        }
    };
    let joined = match finished_first {
        Some(joined) => joined,
        None => session.await,
    };
    let report = joined
        .map_err(|e| VoiceError::Channel(format!("voice session task failed: {e}")))??;

    // The controller held the only senders, so both tasks drain and exit.
    match forwarder.await {
        Ok(Err(e)) => tracing::warn!(error = %e, "event forwarder stopped early"),
        Err(e) => tracing::warn!(error = %e, "event forwarder task failed"),
        Ok(Ok(_)) => {}
    }
    if let Err(e) = game.await {
        tracing::warn!(error = %e, "game command task failed");
    }

    Ok(report)
}

/// Read lines from `reader` into the engine feed until EOF or `!quit`.
///
/// # Errors
///
/// Returns an error if reading fails.
pub async fn run_reader<R: AsyncBufRead + Unpin>(
    mut reader: R,
    feed: ConsoleFeed,
    control_tx: mpsc::UnboundedSender<SessionControl>,
) -> Result<()> {
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| VoiceError::Channel(format!("failed to read from stdin: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("stdin closed (EOF); shutting down voice session");
            break;
        }

        let control = match line.trim() {
            "!stop" => Some(SessionControl::StopListening),
            "!start" => Some(SessionControl::StartListening),
            "!restart" => Some(SessionControl::Restart),
            "!quit" => break,
            _ => None,
        };
        if let Some(control) = control {
            if control_tx.send(control).is_err() {
                break;
            }
            continue;
        }

        if !feed.push_line(&line) {
            tracing::info!("console engine released; stopping reader");
            return Ok(());
        }
    }

    // Ignore failure: the session may already be gone.
    let _ = control_tx.send(SessionControl::Shutdown);
    Ok(())
}

/// Write every event from `rx` to `writer` as a JSON line.
///
/// Returns the writer once the channel closes.
///
/// # Errors
///
/// Returns an error if writing fails.
pub async fn forward_events<W: AsyncWrite + Unpin>(
    mut rx: mpsc::UnboundedReceiver<VoiceEvent>,
    mut writer: W,
) -> Result<W> {
    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(json) => write_line(&mut writer, &json).await?,
            Err(e) => tracing::error!(error = %e, "failed to serialize voice event; skipping"),
        }
    }
    tracing::debug!("voice event channel closed; stopping forwarder");
    Ok(writer)
}

/// Stand-in for the game: log what it would have been told to do.
async fn log_game_commands(mut rx: mpsc::UnboundedReceiver<GameCommand>) {
    while let Some(command) = rx.recv().await {
        tracing::info!(?command, "game received command");
    }
}

/// Write a single JSON line to the writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| VoiceError::Channel(format!("failed to write to stdout: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| VoiceError::Channel(format!("failed to write newline to stdout: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| VoiceError::Channel(format!("failed to flush stdout: {e}")))?;
    Ok(())
}
