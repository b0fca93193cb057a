//! Game-side command dispatch.

use crate::command::GameCommand;
use tokio::sync::mpsc;
use tracing::warn;

/// The game engine's command entry point. Fire-and-forget.
pub trait ActionSink: Send {
    fn dispatch(&self, command: GameCommand);
}

/// Forward commands to whatever task owns the game reducer.
impl ActionSink for mpsc::UnboundedSender<GameCommand> {
    fn dispatch(&self, command: GameCommand) {
        if self.send(command).is_err() {
            warn!(?command, "game command receiver closed, command dropped");
        }
    }
}
