//! Voice command interpretation for game control.
//!
//! Maps noisy recognizer output onto discrete [`GameCommand`]s. Matching is
//! substring containment on the lower-cased last candidate, so filler words
//! ("okay start now") do not prevent a match. Commands are gated by an
//! [`ActivationState`]: repeating a phrase while already in its target state
//! yields nothing, which is the only debounce there is.
//!
//! # Vocabulary
//!
//! | Keyword | Requires | Command | Activation effect |
//! |---------|----------|---------|-------------------|
//! | "start" | not started | `Reset` | started |
//! | "pause" | started | `Pause` | paused |
//! | "resume" | paused | `Resume` | started |
//! | "up" | started | `Drop` | |
//! | "down" | started | `Move(Down)` | |
//! | "left" | started | `Move(Left)` | |
//! | "right" / "write" / "light" | started | `Move(Right)` | |
//! | "rotate" | started | `Rotate` | |
//! | "reset" | started | `Reset` | not started |

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Horizontal or downward piece movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Down,
}

/// A discrete action for the game engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameCommand {
    /// Start a fresh game.
    Reset,
    Pause,
    Resume,
    /// Hard-drop the falling piece.
    Drop,
    Move(Direction),
    Rotate,
}

/// Whether voice control considers the game running or paused.
///
/// `is_started` and `is_paused` are never both true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    pub is_started: bool,
    pub is_paused: bool,
}

/// Precondition a rule needs before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    NotStarted,
    Started,
    Paused,
}

/// Change a rule applies to the activation state when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    None,
    Start,
    Pause,
    Resume,
    Stop,
}

struct KeywordRule {
    keywords: &'static [&'static str],
    guard: Guard,
    command: GameCommand,
    effect: Effect,
}

/// Ordered rule table; the first rule with a matching keyword decides.
const RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["start"],
        guard: Guard::NotStarted,
        command: GameCommand::Reset,
        effect: Effect::Start,
    },
    KeywordRule {
        keywords: &["pause"],
        guard: Guard::Started,
        command: GameCommand::Pause,
        effect: Effect::Pause,
    },
    KeywordRule {
        keywords: &["resume"],
        guard: Guard::Paused,
        command: GameCommand::Resume,
        effect: Effect::Resume,
    },
    KeywordRule {
        keywords: &["up"],
        guard: Guard::Started,
        command: GameCommand::Drop,
        effect: Effect::None,
    },
    KeywordRule {
        keywords: &["down"],
        guard: Guard::Started,
        command: GameCommand::Move(Direction::Down),
        effect: Effect::None,
    },
    KeywordRule {
        keywords: &["left"],
        guard: Guard::Started,
        command: GameCommand::Move(Direction::Left),
        effect: Effect::None,
    },
    // "write" and "light" are frequent mis-hearings of "right".
    KeywordRule {
        keywords: &["right", "write", "light"],
        guard: Guard::Started,
        command: GameCommand::Move(Direction::Right),
        effect: Effect::None,
    },
    KeywordRule {
        keywords: &["rotate"],
        guard: Guard::Started,
        command: GameCommand::Rotate,
        effect: Effect::None,
    },
    KeywordRule {
        keywords: &["reset"],
        guard: Guard::Started,
        command: GameCommand::Reset,
        effect: Effect::Stop,
    },
];

impl ActivationState {
    fn satisfies(self, guard: Guard) -> bool {
        match guard {
            Guard::NotStarted => !self.is_started,
            Guard::Started => self.is_started,
            Guard::Paused => self.is_paused,
        }
    }

    fn with_effect(self, effect: Effect) -> Self {
        match effect {
            Effect::None => self,
            Effect::Start | Effect::Resume => Self {
                is_started: true,
                is_paused: false,
            },
            Effect::Pause => Self {
                is_started: false,
                is_paused: true,
            },
            Effect::Stop => Self {
                is_started: false,
                ..self
            },
        }
    }

    /// Interpret one lower-cased utterance against this state.
    ///
    /// Returns the command (if any) and the state after it.
    #[must_use]
    pub fn apply(self, text: &str) -> (Option<GameCommand>, Self) {
        let Some(rule) = RULES
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| text.contains(k)))
        else {
            return (None, self);
        };

        if !self.satisfies(rule.guard) {
            debug!(command = ?rule.command, state = ?self, "voice command suppressed by activation state");
            return (None, self);
        }

        (Some(rule.command), self.with_effect(rule.effect))
    }
}

/// Stateful interpreter owning the [`ActivationState`].
///
/// The state survives engine restarts; only matched commands change it.
#[derive(Debug, Default)]
pub struct CommandInterpreter {
    state: ActivationState,
}

impl CommandInterpreter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume interpretation from a previously saved state.
    #[must_use]
    pub fn with_state(state: ActivationState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Interpret a candidate list. The last candidate is the authoritative
    /// hypothesis; an empty list yields nothing.
    pub fn interpret(&mut self, candidates: &[String]) -> Option<GameCommand> {
        let text = candidates.last()?.to_lowercase();
        let (command, next) = self.state.apply(&text);
        self.state = next;
        command
    }
}
